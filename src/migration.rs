//! The module for migrating the database.
use std::fmt::Display;

use async_trait::async_trait;
use log::info;
use sea_orm::{
	prelude::*,
	sea_query::{ColumnDef, *},
	DatabaseConnection, DatabaseTransaction, Statement,
	TransactionTrait,
};

use crate::trace;

mod v0_1;


/// The latest database version.
pub const LATEST_VERSION: Version = Version { major: 0, minor: 1 };


type Result<T, E> = trace::Result<T, E>;


#[derive(Clone, Debug)]
pub struct Version {
	major: u32,
	minor: u32,
}

pub struct Migrations {
	/// A list of available migrations, ordered at version
	list: Vec<(Version, Box<dyn MigrationTrait + Send + Sync>)>,
}

#[async_trait]
trait MigrationTrait {
	async fn run(&self, tx: &DatabaseTransaction) -> Result<(), DbErr>;
}


impl Migrations {
	pub fn load() -> Self {
		Self {
			list: vec![(Version::new(0, 1), Box::new(v0_1::Migration))],
		}
	}

	/// Creates the version table for a fresh database, starting at v0.0.
	async fn prepare_version_table(&self, connection: &DatabaseConnection) -> Result<(), DbErr> {
		let backend = connection.get_database_backend();
		let stat = Table::create()
			.table(Alias::new("version"))
			.if_not_exists()
			.col(ColumnDef::new(Alias::new("major")).integer().not_null())
			.col(ColumnDef::new(Alias::new("minor")).integer().not_null())
			.to_owned();
		connection.execute(backend.build(&stat)).await?;

		let row = connection
			.query_one(Statement::from_string(
				backend,
				"SELECT COUNT(*) FROM version".to_owned(),
			))
			.await?;
		let count: i64 = match row {
			Some(r) => r.try_get_by_index(0)?,
			None => 0,
		};
		if count == 0 {
			let stat = Query::insert()
				.into_table(Alias::new("version"))
				.columns([Alias::new("major"), Alias::new("minor")])
				.values_panic([0.into(), 0.into()])
				.to_owned();
			connection.execute(backend.build(&stat)).await?;
		}
		Ok(())
	}

	async fn load_version(&self, connection: &DatabaseConnection) -> Result<Version, DbErr> {
		let q = Query::select()
			.from(Alias::new("version"))
			.column(Alias::new("major"))
			.column(Alias::new("minor"))
			.to_owned();
		let backend = connection.get_database_backend();
		let r = connection.query_one(backend.build(&q)).await?;
		let result = match r {
			Some(row) => row,
			None => return Err(DbErr::RecordNotFound("no version in the database".to_owned()).into()),
		};
		let major: u32 = result.try_get_by_index(0)?;
		let minor: u32 = result.try_get_by_index(1)?;
		Ok(Version::new(major, minor))
	}

	async fn store_version(
		&self, tx: &DatabaseTransaction, version: &Version,
	) -> Result<(), DbErr> {
		let q = Query::update()
			.table(Alias::new("version"))
			.values([
				(Alias::new("major"), version.major.into()),
				(Alias::new("minor"), version.minor.into()),
			])
			.to_owned();
		let _ = tx.execute(tx.get_database_backend().build(&q)).await?;
		Ok(())
	}

	pub async fn run(&self, connection: &DatabaseConnection) -> Result<(), DbErr> {
		self.prepare_version_table(connection).await?;
		let mut current_version = self.load_version(connection).await?;

		for (new_version, migration) in &self.list {
			if new_version > &current_version {
				let tx = connection.begin().await?;
				info!(
					"Running database migration from {} to {}...",
					current_version, new_version
				);
				migration.run(&tx).await?;
				self.store_version(&tx, new_version).await?;
				tx.commit().await?;
				info!("Migrated database to {}.", new_version);
				current_version = new_version.clone();
			}
		}

		if current_version != LATEST_VERSION {
			return Err(DbErr::Migration(format!(
				"database is at {}, which is newer than {}",
				current_version, LATEST_VERSION
			))
			.into());
		}
		Ok(())
	}
}

impl Version {
	pub fn new(major: u32, minor: u32) -> Self { Self { major, minor } }
}

impl Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "v{}.{}", self.major, self.minor)
	}
}

impl PartialEq for Version {
	fn eq(&self, other: &Self) -> bool { self.major == other.major && self.minor == other.minor }
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		match self.major.partial_cmp(&other.major) {
			Some(core::cmp::Ordering::Equal) => {}
			ord => return ord,
		}
		self.minor.partial_cmp(&other.minor)
	}
}
