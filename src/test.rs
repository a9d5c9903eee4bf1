//! Helpers shared by the unit and integration tests.

use std::{ops::Deref, str::FromStr};

use log::*;
use tempfile::TempDir;

use crate::{
	common::ExactDecimal,
	config::Config,
	db::{Database, NewUnitDefinition},
	migration::Migrations,
};


/// A migrated database in a temporary directory, which is removed again once
/// this is dropped.
pub struct TestDatabase {
	db: Database,
	_dir: TempDir,
}


pub async fn load_database(filename: &str) -> TestDatabase {
	let dir = TempDir::with_prefix(filename).unwrap();
	let path = dir.path().join(format!("{}.sqlite", filename));
	let db = Database::load(path).await.expect("unable to load database");
	let migrations = Migrations::load();
	migrations.run(&db.orm).await.expect("migration issue");
	debug!("Loaded database at {}", db.path().display());
	TestDatabase { db, _dir: dir }
}

/// A config that doesn't make the tests wait.
pub fn test_config() -> Config {
	Config {
		worker_name: Some("test-worker".to_string()),
		step_delay_ms: 1,
		poll_interval_ms: 10,
		..Config::default()
	}
}

/// A unit definition with a precision of 4 decimal places.
pub fn definition(
	name: &str, unit_type_id: i64, scale_factor: &str, offset: &str, is_base: bool,
) -> NewUnitDefinition {
	NewUnitDefinition {
		name: name.to_string(),
		unit_type_id,
		scale_factor: ExactDecimal::from_str(scale_factor).unwrap(),
		offset: ExactDecimal::from_str(offset).unwrap(),
		is_base,
		alias_text: None,
		precision: 4,
		calculation_method: None,
		created_by: None,
	}
}


impl Deref for TestDatabase {
	type Target = Database;

	fn deref(&self) -> &Self::Target { &self.db }
}
