use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_data_source")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	#[sea_orm(unique)]
	pub data_source_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::scenario_component::Entity")]
	ScenarioComponent,
}

impl Related<super::scenario_component::Entity> for Entity {
	fn to() -> RelationDef { Relation::ScenarioComponent.def() }
}

impl ActiveModelBehavior for ActiveModel {}
