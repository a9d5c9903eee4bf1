//! A calculation server that scenarios can be assigned to.
//!
//! Servers are never deleted, only deactivated. Inactive servers are left out
//! of the default listing.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "apiapp_servers")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub server_id: i64,
	#[sea_orm(unique)]
	pub server_name: String,
	#[sea_orm(unique)]
	pub server_url: String,
	pub server_status: String,
	pub description: String,
	pub created_by_id: Option<i64>,
	pub created_date: DateTimeUtc,
	pub is_active: bool,
	/// Host name of the worker that last ran a scenario on this server.
	pub worker_host: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::user::Entity",
		from = "Column::CreatedById",
		to = "super::user::Column::Id",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	CreatedBy,
}

impl ActiveModelBehavior for ActiveModel {}
