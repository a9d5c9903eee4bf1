//! A concrete unit, e.g. "ft/s2", and how it relates to the base unit of its
//! type.
//!
//! A value `v` expressed in this unit equals `(v + offset) * scale_factor` in
//! the base unit.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::common::ExactDecimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_unit_definition")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub unit_definition_id: i64,
	pub unit_definition_name: String,
	pub unit_type_id: i64,
	pub scale_factor: ExactDecimal,
	pub offset: ExactDecimal,
	pub is_base: bool,
	pub alias_text: Option<String>,
	pub precision: i32,
	pub created_date: DateTimeUtc,
	pub modified_date: DateTimeUtc,
	pub created_by: Option<i64>,
	pub modified_by: Option<i64>,
	pub calculation_method: Option<i32>,
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
}

impl Related<super::unit_type::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitType.def() }
}

impl ActiveModelBehavior for ActiveModel {}
