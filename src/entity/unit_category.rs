//! Groups quantities that share a unit type, e.g. "Angle" or "Anisotropy".

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_unit_category")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub unit_category_id: i64,
	pub unit_type_id: i64,
	pub unit_category_name: String,
	pub created_date: DateTimeUtc,
	pub modified_date: DateTimeUtc,
	pub created_by: Option<i64>,
	pub modified_by: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::unit_type::Entity",
		from = "Column::UnitTypeId",
		to = "super::unit_type::Column::UnitTypeId",
		on_update = "NoAction",
		on_delete = "Restrict"
	)]
	UnitType,
	#[sea_orm(has_many = "super::unit_system_category_definition::Entity")]
	CategoryDefinition,
}

impl Related<super::unit_type::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitType.def() }
}

impl Related<super::unit_system_category_definition::Entity> for Entity {
	fn to() -> RelationDef { Relation::CategoryDefinition.def() }
}

impl ActiveModelBehavior for ActiveModel {}
