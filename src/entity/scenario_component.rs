//! A named data artifact, tied to one data source and optionally backed by a
//! file stored outside of the database.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_scenario_component")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	#[sea_orm(unique)]
	pub name: String,
	pub description: String,
	pub data_source_id: i64,
	pub created_by_id: Option<i64>,
	pub created_date: DateTimeUtc,
	pub last_updated: Option<DateTimeUtc>,
	/// Path of the attached file, relative to the file root.
	pub file: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::data_source::Entity",
		from = "Column::DataSourceId",
		to = "super::data_source::Column::Id",
		on_update = "NoAction",
		on_delete = "Restrict"
	)]
	DataSource,
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::CreatedById",
		to = "super::user::Column::Id",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	CreatedBy,
}

impl Related<super::data_source::Entity> for Entity {
	fn to() -> RelationDef { Relation::DataSource.def() }
}

impl ActiveModelBehavior for ActiveModel {}
