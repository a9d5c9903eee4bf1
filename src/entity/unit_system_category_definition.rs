//! Says which unit definition a unit system uses for a unit category.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_unit_system_category_definition")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub unit_system_category_definition_id: i64,
	pub unit_system_id: i64,
	pub unit_category_id: i64,
	pub unit_definition_id: i64,
	pub created_date: DateTimeUtc,
	pub modified_date: DateTimeUtc,
	pub created_by: Option<i64>,
	pub modified_by: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::unit_system::Entity",
		from = "Column::UnitSystemId",
		to = "super::unit_system::Column::UnitSystemId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	UnitSystem,
	#[sea_orm(
		belongs_to = "super::unit_category::Entity",
		from = "Column::UnitCategoryId",
		to = "super::unit_category::Column::UnitCategoryId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	UnitCategory,
	#[sea_orm(
		belongs_to = "super::unit_definition::Entity",
		from = "Column::UnitDefinitionId",
		to = "super::unit_definition::Column::UnitDefinitionId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	UnitDefinition,
}

impl Related<super::unit_system::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitSystem.def() }
}

impl Related<super::unit_category::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitCategory.def() }
}

impl Related<super::unit_definition::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitDefinition.def() }
}

impl ActiveModelBehavior for ActiveModel {}
