//! A system of units, e.g. "Oil Field" or "Norwegian S.I.".

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_unit_system")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub unit_system_id: i64,
	#[sea_orm(unique)]
	pub unit_system_name: String,
	pub created_date: DateTimeUtc,
	pub modified_date: DateTimeUtc,
	pub created_by: Option<i64>,
	pub modified_by: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::unit_system_category_definition::Entity")]
	CategoryDefinition,
}

impl Related<super::unit_system_category_definition::Entity> for Entity {
	fn to() -> RelationDef { Relation::CategoryDefinition.def() }
}

impl ActiveModelBehavior for ActiveModel {}
