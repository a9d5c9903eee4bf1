//! The physical quantity a unit measures, e.g. "Viscosity".

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_unit_type")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub unit_type_id: i64,
	#[sea_orm(unique)]
	pub unit_type_name: String,
	pub created_date: DateTimeUtc,
	pub modified_date: DateTimeUtc,
	pub created_by: Option<i64>,
	pub modified_by: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::unit_definition::Entity")]
	UnitDefinition,
	#[sea_orm(has_many = "super::unit_category::Entity")]
	UnitCategory,
}

impl Related<super::unit_definition::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitDefinition.def() }
}

impl Related<super::unit_category::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitCategory.def() }
}

impl ActiveModelBehavior for ActiveModel {}
