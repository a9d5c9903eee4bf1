//! A single timestamped value of an object instance's property, as delivered
//! by a data source.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::common::ExactDecimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_mainclass")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub data_set_id: i64,
	pub data_source_name_id: i64,
	/// Identifier of the record within its data source.
	pub data_source_id: i64,
	pub object_type_id: i64,
	pub object_instance_id: i64,
	pub object_type_property_id: i64,
	pub value: Option<ExactDecimal>,
	#[sea_orm(column_name = "date")]
	pub date_time: Option<DateTimeUtc>,
	pub sub_data_source: Option<String>,
	pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::data_source::Entity",
		from = "Column::DataSourceNameId",
		to = "super::data_source::Column::Id",
		on_update = "NoAction",
		on_delete = "Restrict"
	)]
	DataSource,
	#[sea_orm(
		belongs_to = "super::object_type::Entity",
		from = "Column::ObjectTypeId",
		to = "super::object_type::Column::ObjectTypeId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	ObjectType,
	#[sea_orm(
		belongs_to = "super::object_instance::Entity",
		from = "Column::ObjectInstanceId",
		to = "super::object_instance::Column::ObjectInstanceId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	ObjectInstance,
	#[sea_orm(
		belongs_to = "super::object_type_property::Entity",
		from = "Column::ObjectTypePropertyId",
		to = "super::object_type_property::Column::ObjectTypePropertyId",
		on_update = "NoAction",
		on_delete = "Cascade"
	)]
	ObjectTypeProperty,
}

impl Related<super::data_source::Entity> for Entity {
	fn to() -> RelationDef { Relation::DataSource.def() }
}

impl Related<super::object_instance::Entity> for Entity {
	fn to() -> RelationDef { Relation::ObjectInstance.def() }
}

impl ActiveModelBehavior for ActiveModel {}
