use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_scenario_component_link")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub scenario_id: i64,
	pub component_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::scenario::Entity",
		from = "Column::ScenarioId",
		to = "super::scenario::Column::ScenarioId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	Scenario,
	#[sea_orm(
		belongs_to = "super::scenario_component::Entity",
		from = "Column::ComponentId",
		to = "super::scenario_component::Column::Id",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	Component,
}

impl Related<super::scenario::Entity> for Entity {
	fn to() -> RelationDef { Relation::Scenario.def() }
}

impl Related<super::scenario_component::Entity> for Entity {
	fn to() -> RelationDef { Relation::Component.def() }
}

impl ActiveModelBehavior for ActiveModel {}
