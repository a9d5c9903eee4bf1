use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_object_type")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub object_type_id: i64,
	#[sea_orm(unique)]
	pub object_type_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::object_instance::Entity")]
	ObjectInstance,
	#[sea_orm(has_many = "super::object_type_property::Entity")]
	ObjectTypeProperty,
}

impl Related<super::object_instance::Entity> for Entity {
	fn to() -> RelationDef { Relation::ObjectInstance.def() }
}

impl Related<super::object_type_property::Entity> for Entity {
	fn to() -> RelationDef { Relation::ObjectTypeProperty.def() }
}

impl ActiveModelBehavior for ActiveModel {}
