//! A measurable property of an object type.
//!
//! `unit_id` is never written directly. The store derives it from
//! `unit_category_id` on every save.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_object_type_property")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub object_type_property_id: i64,
	pub object_type_id: i64,
	pub object_type_property_name: String,
	pub object_type_property_category: String,
	pub tag: Option<String>,
	pub openserver: Option<String>,
	pub unit_category_id: Option<i64>,
	pub unit_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::object_type::Entity",
		from = "Column::ObjectTypeId",
		to = "super::object_type::Column::ObjectTypeId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	ObjectType,
	#[sea_orm(
		belongs_to = "super::unit_category::Entity",
		from = "Column::UnitCategoryId",
		to = "super::unit_category::Column::UnitCategoryId",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	UnitCategory,
	#[sea_orm(
		belongs_to = "super::unit_definition::Entity",
		from = "Column::UnitId",
		to = "super::unit_definition::Column::UnitDefinitionId",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	Unit,
}

impl Related<super::object_type::Entity> for Entity {
	fn to() -> RelationDef { Relation::ObjectType.def() }
}

impl Related<super::unit_category::Entity> for Entity {
	fn to() -> RelationDef { Relation::UnitCategory.def() }
}

impl Related<super::unit_definition::Entity> for Entity {
	fn to() -> RelationDef { Relation::Unit.def() }
}

impl ActiveModelBehavior for ActiveModel {}
