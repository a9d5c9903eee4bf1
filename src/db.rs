mod catalog;
mod fact;
mod reference;
mod scenario;
mod task;

use std::{path::*, time::Duration};

use async_trait::async_trait;
use log::*;
use sea_orm::{prelude::*, *};
use thiserror::Error;

pub use self::{catalog::*, fact::*, reference::*, scenario::*, task::*};
use crate::{
	common::DecimalError,
	trace::{self, Traceable, Traced},
};


#[derive(Clone)]
pub struct Database {
	path: PathBuf,
	pub(crate) orm: DatabaseConnection,
}

pub struct Transaction(pub(crate) DatabaseTransaction);

#[derive(Debug, Error)]
pub enum Error {
	#[error("database error: {0}")]
	OrmError(DbErr),
	/// A natural key is already taken by another record.
	#[error("uniqueness violation: {0}")]
	UniquenessViolation(String),
	/// A record can't be deleted because other records still depend on it.
	#[error("{0} is still referenced")]
	ReferentialBlock(String),
	#[error("scenario {scenario_id} already has a component with data source '{data_source}'")]
	LinkConflict {
		scenario_id: i64,
		data_source: String,
	},
	#[error(
		"object instance {object_instance_id} belongs to object type {actual}, not to {expected}"
	)]
	CrossTypeMismatch {
		object_instance_id: i64,
		expected: i64,
		actual: i64,
	},
	#[error("{0} {1} not found")]
	NotFound(&'static str, String),
	#[error("invalid decimal: {0}")]
	InvalidDecimal(DecimalError),
	#[error("unit definitions {from} and {to} are not of the same unit type")]
	IncompatibleUnits { from: i64, to: i64 },
	#[error(
		"unit definition {unit_definition_id} does not measure the unit type of category \
		 {unit_category_id}"
	)]
	CategoryMismatch {
		unit_category_id: i64,
		unit_definition_id: i64,
	},
	#[error("progress {0} is not within 0 and 100")]
	InvalidProgress(i32),
	#[error("scenario {0} is already running")]
	ScenarioBusy(i64),
	#[error("unable to encode task result: {0}")]
	Serialization(serde_json::Error),
}

pub type Result<T> = trace::Result<T, self::Error>;


/// Gives the stores access to something that can run queries, which is either
/// the database itself or an open transaction.
pub trait PersistenceHandle: Send + Sync + Sized {
	type Inner: ConnectionTrait;

	fn inner(&self) -> &Self::Inner;

	fn backend(&self) -> DatabaseBackend { self.inner().get_database_backend() }
}


impl Database {
	pub async fn load(path: PathBuf) -> Result<Self> {
		let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
		opts.idle_timeout(Duration::from_secs(10));
		opts.acquire_timeout(Duration::from_secs(5));
		opts.sqlx_logging_level(LevelFilter::Trace);
		let orm = sea_orm::Database::connect(opts)
			.await
			.map_err(|e| Error::OrmError(e).trace())?;
		debug!("Opened database at {}.", path.display());

		Ok(Self { path, orm })
	}

	pub fn path(&self) -> &Path { &self.path }

	pub async fn transaction(&self) -> Result<Transaction> {
		let tx = self.orm.begin().await?;
		Ok(Transaction(tx))
	}

	pub async fn close(self) -> Result<()> {
		self.orm.close().await?;
		Ok(())
	}
}

impl Transaction {
	pub async fn commit(self) -> Result<()> {
		self.0.commit().await?;
		Ok(())
	}

	pub async fn rollback(self) -> Result<()> {
		self.0.rollback().await?;
		Ok(())
	}
}

impl PersistenceHandle for Database {
	type Inner = DatabaseConnection;

	fn inner(&self) -> &Self::Inner { &self.orm }
}

impl PersistenceHandle for Transaction {
	type Inner = DatabaseTransaction;

	fn inner(&self) -> &Self::Inner { &self.0 }
}

impl From<DbErr> for Error {
	fn from(other: DbErr) -> Self {
		match other.sql_err() {
			Some(SqlErr::UniqueConstraintViolation(message)) => Self::UniquenessViolation(message),
			Some(SqlErr::ForeignKeyConstraintViolation(message)) =>
				Self::ReferentialBlock(message),
			_ => match foreign_key_violation(&other) {
				Some(message) => Self::ReferentialBlock(message),
				None => Self::OrmError(other),
			},
		}
	}
}

impl From<DbErr> for Traced<Error> {
	fn from(other: DbErr) -> Self { Error::from(other).trace() }
}

impl From<DecimalError> for Traced<Error> {
	fn from(other: DecimalError) -> Self { Error::InvalidDecimal(other).trace() }
}

impl From<serde_json::Error> for Traced<Error> {
	fn from(other: serde_json::Error) -> Self { Error::Serialization(other).trace() }
}

/// SQLite reports a blocked `ON DELETE RESTRICT` with extended code 1811
/// rather than 787, which `DbErr::sql_err` doesn't recognize.
fn foreign_key_violation(err: &DbErr) -> Option<String> {
	let runtime = match err {
		DbErr::Exec(e) | DbErr::Query(e) => e,
		_ => return None,
	};
	match runtime {
		RuntimeErr::SqlxError(sea_orm::SqlxError::Database(e)) => {
			let known_code = matches!(e.code().as_deref(), Some("787") | Some("1811"));
			if known_code && e.message().contains("FOREIGN KEY constraint failed") {
				Some(e.message().to_string())
			} else {
				None
			}
		}
		_ => None,
	}
}

/// Turns a missing record into a `NotFound` error.
pub(crate) fn expect_found<T>(
	record: Option<T>, entity: &'static str, key: impl ToString,
) -> Result<T> {
	match record {
		Some(r) => Ok(r),
		None => trace::err(Error::NotFound(entity, key.to_string())),
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::test;

	#[tokio::test]
	async fn test_transaction_rollback() {
		let db = test::load_database("transaction").await;

		let tx = db.transaction().await.unwrap();
		tx.create_data_source("OFM").await.unwrap();
		tx.rollback().await.unwrap();
		assert!(db.list_data_sources().await.unwrap().is_empty());

		let tx = db.transaction().await.unwrap();
		tx.create_data_source("OFM").await.unwrap();
		tx.commit().await.unwrap();
		assert_eq!(db.list_data_sources().await.unwrap().len(), 1);
	}
}
