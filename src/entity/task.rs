//! A submitted background task and its last known state.
//!
//! This table doubles as the queue the workers claim their work from and as
//! the result backend that progress is polled from.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
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
#[sea_orm(table_name = "worker_task")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub task_id: String,
	pub name: String,
	pub scenario_id: i64,
	pub start_date: String,
	pub end_date: String,
	pub state: State,
	pub progress: i32,
	/// Set when a revoke has been requested while the task was running.
	pub revoke_requested: bool,
	pub worker: Option<String>,
	/// JSON encoded task result.
	pub result: Option<String>,
	pub created: DateTimeUtc,
	pub updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl State {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Success | Self::Failure | Self::Revoked)
	}
}
