use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_scenariolog")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub scenario_id: i64,
	pub timestamp: DateTimeUtc,
	pub message: String,
	/// Percentage, 0 up to and including 100.
	pub progress: i32,
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
}

impl Related<super::scenario::Entity> for Entity {
	fn to() -> RelationDef { Relation::Scenario.def() }
}

impl ActiveModelBehavior for ActiveModel {}
