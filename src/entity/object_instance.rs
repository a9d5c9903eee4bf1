//! A concrete object of some object type, e.g. a single well.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_object_instance")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub object_instance_id: i64,
	pub object_type_id: i64,
	#[sea_orm(unique)]
	pub object_instance_name: String,
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
}

impl Related<super::object_type::Entity> for Entity {
	fn to() -> RelationDef { Relation::ObjectType.def() }
}

impl ActiveModelBehavior for ActiveModel {}
