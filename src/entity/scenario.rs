//! A named unit of work with a lifecycle status and an optional server.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(50))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
	#[sea_orm(string_value = "PENDING")]
	Pending,
	#[sea_orm(string_value = "STARTED")]
	Started,
	#[sea_orm(string_value = "SUCCESS")]
	Success,
	#[sea_orm(string_value = "FAILURE")]
	Failure,
	#[sea_orm(string_value = "REVOKED")]
	Revoked,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_scenarios")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub scenario_id: i64,
	#[sea_orm(unique)]
	pub scenario_name: String,
	pub description: String,
	pub status: Status,
	pub start_date: Option<DateTimeUtc>,
	pub end_date: Option<DateTimeUtc>,
	pub task_id: Option<String>,
	pub server_id: Option<i64>,
	pub is_approved: bool,
	pub created_by_id: Option<i64>,
	pub created_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::server::Entity",
		from = "Column::ServerId",
		to = "super::server::Column::ServerId",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	Server,
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::CreatedById",
		to = "super::user::Column::Id",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	CreatedBy,
	#[sea_orm(has_many = "super::scenario_log::Entity")]
	Log,
}

impl Related<super::server::Entity> for Entity {
	fn to() -> RelationDef { Relation::Server.def() }
}

impl Related<super::scenario_log::Entity> for Entity {
	fn to() -> RelationDef { Relation::Log.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Status {
	/// Whether a run has come to an end, one way or another.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Success | Self::Failure | Self::Revoked)
	}
}
