//! Storage of users, servers, scenario components, scenarios, the links
//! between scenarios and components, and the logs that runs leave behind.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::*;
use sea_orm::{prelude::*, *};

use super::{expect_found, Error, PersistenceHandle, Result};
use crate::{
	common::now,
	entity::{
		data_source, scenario, scenario::Status, scenario_component, scenario_component_link,
		scenario_log, server, user,
	},
	trace,
};


#[derive(Clone, Debug, Default)]
pub struct NewServer {
	pub name: String,
	pub url: String,
	pub status: String,
	pub description: String,
	pub created_by: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct NewScenarioComponent {
	pub name: String,
	pub description: String,
	pub data_source_id: i64,
	pub created_by: Option<i64>,
	/// Path relative to the file root.
	pub file: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewScenario {
	pub name: String,
	pub description: String,
	pub server_id: Option<i64>,
	pub created_by: Option<i64>,
}


/// Resolves the file attached to a component within the file root. Paths that
/// would point outside of the file root resolve to nothing.
pub fn attachment_path(file_root: &Path, component: &scenario_component::Model) -> Option<PathBuf> {
	let file = Path::new(component.file.as_deref()?);
	if file.as_os_str().is_empty() {
		return None;
	}
	let escapes = file
		.components()
		.any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
	if escapes {
		warn!(
			"Ignoring file {} of component {}.",
			file.display(),
			component.id
		);
		return None;
	}
	Some(file_root.join(file))
}


#[async_trait]
pub trait ScenarioStore: PersistenceHandle {
	async fn create_user(&self, username: &str) -> Result<user::Model> {
		let record = user::ActiveModel {
			id: NotSet,
			username: Set(username.to_string()),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn find_user(&self, id: i64) -> Result<Option<user::Model>> {
		Ok(user::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn create_server(&self, server: NewServer) -> Result<server::Model> {
		let record = server::ActiveModel {
			server_id: NotSet,
			server_name: Set(server.name),
			server_url: Set(server.url),
			server_status: Set(server.status),
			description: Set(server.description),
			created_by_id: Set(server.created_by),
			created_date: Set(now()),
			is_active: Set(true),
			worker_host: Set(None),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn update_server(&self, server: server::Model) -> Result<server::Model> {
		let existing = expect_found(
			self.find_server(server.server_id).await?,
			"server",
			server.server_id,
		)?;
		let mut record: server::ActiveModel = existing.into();
		record.server_name = Set(server.server_name);
		record.server_url = Set(server.server_url);
		record.server_status = Set(server.server_status);
		record.description = Set(server.description);
		record.is_active = Set(server.is_active);
		Ok(record.update(self.inner()).await?)
	}

	/// Finds a server, whether it is active or not.
	async fn find_server(&self, id: i64) -> Result<Option<server::Model>> {
		Ok(server::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn list_active_servers(&self) -> Result<Vec<server::Model>> {
		Ok(server::Entity::find()
			.filter(server::Column::IsActive.eq(true))
			.order_by_desc(server::Column::CreatedDate)
			.order_by_desc(server::Column::ServerId)
			.all(self.inner())
			.await?)
	}

	async fn list_all_servers(&self) -> Result<Vec<server::Model>> {
		Ok(server::Entity::find()
			.order_by_desc(server::Column::CreatedDate)
			.order_by_desc(server::Column::ServerId)
			.all(self.inner())
			.await?)
	}

	async fn set_server_active(&self, id: i64, is_active: bool) -> Result<server::Model> {
		let existing = expect_found(self.find_server(id).await?, "server", id)?;
		let mut record: server::ActiveModel = existing.into();
		record.is_active = Set(is_active);
		Ok(record.update(self.inner()).await?)
	}

	async fn activate_server(&self, id: i64) -> Result<server::Model> {
		self.set_server_active(id, true).await
	}

	async fn deactivate_server(&self, id: i64) -> Result<server::Model> {
		self.set_server_active(id, false).await
	}

	/// Stores the host name of the worker that picked up a scenario on the
	/// scenario's server. The server's own name is left alone.
	async fn record_server_host(&self, id: i64, host: &str) -> Result<server::Model> {
		let existing = expect_found(self.find_server(id).await?, "server", id)?;
		let mut record: server::ActiveModel = existing.into();
		record.worker_host = Set(Some(host.to_string()));
		Ok(record.update(self.inner()).await?)
	}

	async fn create_scenario_component(
		&self, component: NewScenarioComponent,
	) -> Result<scenario_component::Model> {
		let timestamp = now();
		let record = scenario_component::ActiveModel {
			id: NotSet,
			name: Set(component.name),
			description: Set(component.description),
			data_source_id: Set(component.data_source_id),
			created_by_id: Set(component.created_by),
			created_date: Set(timestamp),
			last_updated: Set(Some(timestamp)),
			file: Set(component.file),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn update_scenario_component(
		&self, component: scenario_component::Model,
	) -> Result<scenario_component::Model> {
		let existing = expect_found(
			self.find_scenario_component(component.id).await?,
			"scenario component",
			component.id,
		)?;
		let mut record: scenario_component::ActiveModel = existing.into();
		record.name = Set(component.name);
		record.description = Set(component.description);
		record.data_source_id = Set(component.data_source_id);
		record.file = Set(component.file);
		record.last_updated = Set(Some(now()));
		Ok(record.update(self.inner()).await?)
	}

	async fn find_scenario_component(&self, id: i64) -> Result<Option<scenario_component::Model>> {
		Ok(scenario_component::Entity::find_by_id(id)
			.one(self.inner())
			.await?)
	}

	async fn list_scenario_components(&self) -> Result<Vec<scenario_component::Model>> {
		Ok(scenario_component::Entity::find()
			.order_by_desc(scenario_component::Column::CreatedDate)
			.order_by_desc(scenario_component::Column::Id)
			.all(self.inner())
			.await?)
	}

	async fn delete_scenario_component(&self, id: i64) -> Result<bool> {
		let result = scenario_component::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn create_scenario(&self, scenario: NewScenario) -> Result<scenario::Model> {
		let record = scenario::ActiveModel {
			scenario_id: NotSet,
			scenario_name: Set(scenario.name),
			description: Set(scenario.description),
			status: Set(Status::Pending),
			start_date: Set(None),
			end_date: Set(None),
			task_id: Set(None),
			server_id: Set(scenario.server_id),
			is_approved: Set(false),
			created_by_id: Set(scenario.created_by),
			created_date: Set(now()),
		};
		Ok(record.insert(self.inner()).await?)
	}

	/// Stores the editable fields of a scenario. The run state (status and
	/// dates) is left alone, that is owned by the runner.
	async fn update_scenario(&self, scenario: scenario::Model) -> Result<scenario::Model> {
		let existing = expect_found(
			self.find_scenario(scenario.scenario_id).await?,
			"scenario",
			scenario.scenario_id,
		)?;
		let mut record: scenario::ActiveModel = existing.into();
		record.scenario_name = Set(scenario.scenario_name);
		record.description = Set(scenario.description);
		record.server_id = Set(scenario.server_id);
		record.is_approved = Set(scenario.is_approved);
		record.task_id = Set(scenario.task_id);
		Ok(record.update(self.inner()).await?)
	}

	async fn set_scenario_approved(&self, id: i64, is_approved: bool) -> Result<scenario::Model> {
		let existing = expect_found(self.find_scenario(id).await?, "scenario", id)?;
		let mut record: scenario::ActiveModel = existing.into();
		record.is_approved = Set(is_approved);
		Ok(record.update(self.inner()).await?)
	}

	async fn set_scenario_task(&self, id: i64, task_id: &str) -> Result<scenario::Model> {
		let existing = expect_found(self.find_scenario(id).await?, "scenario", id)?;
		let mut record: scenario::ActiveModel = existing.into();
		record.task_id = Set(Some(task_id.to_string()));
		Ok(record.update(self.inner()).await?)
	}

	async fn find_scenario(&self, id: i64) -> Result<Option<scenario::Model>> {
		Ok(scenario::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn list_scenarios(&self) -> Result<Vec<scenario::Model>> {
		Ok(scenario::Entity::find()
			.order_by_desc(scenario::Column::CreatedDate)
			.order_by_desc(scenario::Column::ScenarioId)
			.all(self.inner())
			.await?)
	}

	async fn delete_scenario(&self, id: i64) -> Result<bool> {
		let result = scenario::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	/// Marks a scenario as started, unless it already is.
	///
	/// The check and the update happen in a single statement, so of two
	/// workers trying to start the same scenario only one gets through. The
	/// other one gets `ScenarioBusy`.
	async fn start_scenario(&self, id: i64) -> Result<scenario::Model> {
		let changes = scenario::ActiveModel {
			status: Set(Status::Started),
			start_date: Set(Some(now())),
			end_date: Set(None),
			..Default::default()
		};
		let result = scenario::Entity::update_many()
			.set(changes)
			.filter(scenario::Column::ScenarioId.eq(id))
			.filter(scenario::Column::Status.ne(Status::Started))
			.exec(self.inner())
			.await?;

		let scenario = expect_found(self.find_scenario(id).await?, "scenario", id)?;
		if result.rows_affected == 0 {
			debug!("Scenario {} is already started.", id);
			return trace::err(Error::ScenarioBusy(id));
		}
		Ok(scenario)
	}

	/// Puts a started scenario into one of its final states.
	async fn finish_scenario(
		&self, id: i64, status: Status, description: Option<String>,
	) -> Result<scenario::Model> {
		let existing = expect_found(self.find_scenario(id).await?, "scenario", id)?;
		let mut record: scenario::ActiveModel = existing.into();
		record.status = Set(status);
		record.end_date = Set(Some(now()));
		if let Some(description) = description {
			record.description = Set(description);
		}
		Ok(record.update(self.inner()).await?)
	}

	/// Checks that linking the component to the scenario doesn't give the
	/// scenario a second component of the same data source. The link with id
	/// `exclude` is not taken into account, so that an existing link can be
	/// validated against the others.
	async fn validate_link(
		&self, scenario_id: i64, component_id: i64, exclude: Option<i64>,
	) -> Result<()> {
		let component = expect_found(
			self.find_scenario_component(component_id).await?,
			"scenario component",
			component_id,
		)?;

		let mut query = scenario_component_link::Entity::find()
			.inner_join(scenario_component::Entity)
			.filter(scenario_component_link::Column::ScenarioId.eq(scenario_id))
			.filter(scenario_component::Column::DataSourceId.eq(component.data_source_id));
		if let Some(id) = exclude {
			query = query.filter(scenario_component_link::Column::Id.ne(id));
		}
		if query.count(self.inner()).await? == 0 {
			return Ok(());
		}

		let data_source = data_source::Entity::find_by_id(component.data_source_id)
			.one(self.inner())
			.await?
			.map(|d| d.data_source_name)
			.unwrap_or_else(|| component.data_source_id.to_string());
		trace::err(Error::LinkConflict {
			scenario_id,
			data_source,
		})
	}

	async fn link_component(
		&self, scenario_id: i64, component_id: i64,
	) -> Result<scenario_component_link::Model> {
		self.validate_link(scenario_id, component_id, None).await?;
		let record = scenario_component_link::ActiveModel {
			id: NotSet,
			scenario_id: Set(scenario_id),
			component_id: Set(component_id),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn update_link(
		&self, link: scenario_component_link::Model,
	) -> Result<scenario_component_link::Model> {
		let existing = expect_found(
			scenario_component_link::Entity::find_by_id(link.id)
				.one(self.inner())
				.await?,
			"scenario component link",
			link.id,
		)?;
		self.validate_link(link.scenario_id, link.component_id, Some(link.id))
			.await?;

		let mut record: scenario_component_link::ActiveModel = existing.into();
		record.scenario_id = Set(link.scenario_id);
		record.component_id = Set(link.component_id);
		Ok(record.update(self.inner()).await?)
	}

	async fn unlink_component(&self, scenario_id: i64, component_id: i64) -> Result<bool> {
		let result = scenario_component_link::Entity::delete_many()
			.filter(scenario_component_link::Column::ScenarioId.eq(scenario_id))
			.filter(scenario_component_link::Column::ComponentId.eq(component_id))
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn list_linked_components(
		&self, scenario_id: i64,
	) -> Result<Vec<scenario_component::Model>> {
		let rows = scenario_component_link::Entity::find()
			.filter(scenario_component_link::Column::ScenarioId.eq(scenario_id))
			.order_by_asc(scenario_component_link::Column::Id)
			.find_also_related(scenario_component::Entity)
			.all(self.inner())
			.await?;
		Ok(rows.into_iter().filter_map(|(_, c)| c).collect())
	}

	async fn append_scenario_log(
		&self, scenario_id: i64, message: &str, progress: i32,
	) -> Result<scenario_log::Model> {
		if !(0..=100).contains(&progress) {
			return trace::err(Error::InvalidProgress(progress));
		}
		let record = scenario_log::ActiveModel {
			id: NotSet,
			scenario_id: Set(scenario_id),
			timestamp: Set(now()),
			message: Set(message.to_string()),
			progress: Set(progress),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn list_scenario_logs(&self, scenario_id: i64) -> Result<Vec<scenario_log::Model>> {
		Ok(scenario_log::Entity::find()
			.filter(scenario_log::Column::ScenarioId.eq(scenario_id))
			.order_by_asc(scenario_log::Column::Timestamp)
			.order_by_asc(scenario_log::Column::Id)
			.all(self.inner())
			.await?)
	}
}

impl<T> ScenarioStore for T where T: PersistenceHandle {}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::{db::CatalogStore, test};

	async fn component(
		db: &test::TestDatabase, name: &str, data_source_id: i64,
	) -> scenario_component::Model {
		db.create_scenario_component(NewScenarioComponent {
			name: name.to_string(),
			data_source_id,
			..Default::default()
		})
		.await
		.unwrap()
	}

	#[tokio::test]
	async fn test_one_component_per_data_source() {
		let db = test::load_database("link_conflict").await;

		let ofm = db.create_data_source("OFM").await.unwrap();
		let petrel = db.create_data_source("Petrel").await.unwrap();
		let rates = component(&db, "Rates", ofm.id).await;
		let pressures = component(&db, "Pressures", ofm.id).await;
		let grid = component(&db, "Grid", petrel.id).await;
		let scenario = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		let other = db
			.create_scenario(NewScenario {
				name: "Low case".to_string(),
				..Default::default()
			})
			.await
			.unwrap();

		let link = db
			.link_component(scenario.scenario_id, rates.id)
			.await
			.unwrap();
		db.link_component(scenario.scenario_id, grid.id)
			.await
			.unwrap();
		let error = db
			.link_component(scenario.scenario_id, pressures.id)
			.await
			.unwrap_err();
		match &*error {
			Error::LinkConflict {
				scenario_id,
				data_source,
			} => {
				assert_eq!(*scenario_id, scenario.scenario_id);
				assert_eq!(data_source, "OFM");
			}
			other => panic!("unexpected error: {}", other),
		}

		// Another scenario is free to use it
		db.link_component(other.scenario_id, pressures.id)
			.await
			.unwrap();

		// An existing link doesn't conflict with itself
		let mut moved = link.clone();
		moved.component_id = pressures.id;
		let moved = db.update_link(moved).await.unwrap();
		assert_eq!(moved.component_id, pressures.id);

		let linked = db
			.list_linked_components(scenario.scenario_id)
			.await
			.unwrap();
		assert_eq!(linked.len(), 2);
		assert_eq!(linked[0].id, pressures.id);
		assert_eq!(linked[1].id, grid.id);
	}

	#[tokio::test]
	async fn test_server_activation() {
		let db = test::load_database("server_activation").await;

		let first = db
			.create_server(NewServer {
				name: "calc-01".to_string(),
				url: "http://calc-01:8000".to_string(),
				status: "online".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		let second = db
			.create_server(NewServer {
				name: "calc-02".to_string(),
				url: "http://calc-02:8000".to_string(),
				status: "online".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(db.list_active_servers().await.unwrap().len(), 2);

		db.deactivate_server(first.server_id).await.unwrap();
		let active = db.list_active_servers().await.unwrap();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].server_id, second.server_id);
		assert_eq!(db.list_all_servers().await.unwrap().len(), 2);
		assert!(db.find_server(first.server_id).await.unwrap().is_some());

		db.activate_server(first.server_id).await.unwrap();
		assert_eq!(db.list_active_servers().await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_scenario_round_trip() {
		let db = test::load_database("scenario_round_trip").await;

		let user = db.create_user("engineer").await.unwrap();
		let scenario = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				description: "Reference forecast".to_string(),
				server_id: None,
				created_by: Some(user.id),
			})
			.await
			.unwrap();
		assert_eq!(scenario.status, Status::Pending);
		assert!(!scenario.is_approved);

		let loaded = db.find_scenario(scenario.scenario_id).await.unwrap();
		assert_eq!(loaded, Some(scenario.clone()));

		let error = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				..Default::default()
			})
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::UniquenessViolation(_)));
	}

	#[tokio::test]
	async fn test_start_scenario_once() {
		let db = test::load_database("start_once").await;

		let scenario = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		let started = db.start_scenario(scenario.scenario_id).await.unwrap();
		assert_eq!(started.status, Status::Started);
		assert!(started.start_date.is_some());

		let error = db.start_scenario(scenario.scenario_id).await.unwrap_err();
		assert!(matches!(&*error, Error::ScenarioBusy(_)));

		let finished = db
			.finish_scenario(scenario.scenario_id, Status::Success, None)
			.await
			.unwrap();
		assert_eq!(finished.status, Status::Success);
		assert!(finished.end_date.is_some());
		assert_eq!(finished.description, "");

		// A finished scenario can be run again
		db.start_scenario(scenario.scenario_id).await.unwrap();

		let error = db.start_scenario(12345).await.unwrap_err();
		assert!(matches!(&*error, Error::NotFound(..)));
	}

	#[tokio::test]
	async fn test_logs_are_ordered_and_bounded() {
		let db = test::load_database("scenario_logs").await;

		let scenario = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		for progress in [0, 50, 100] {
			db.append_scenario_log(scenario.scenario_id, "step", progress)
				.await
				.unwrap();
		}
		let error = db
			.append_scenario_log(scenario.scenario_id, "step", 101)
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::InvalidProgress(101)));

		let logs = db.list_scenario_logs(scenario.scenario_id).await.unwrap();
		let progress: Vec<_> = logs.iter().map(|l| l.progress).collect();
		assert_eq!(progress, vec![0, 50, 100]);

		// Logs go when their scenario goes
		db.delete_scenario(scenario.scenario_id).await.unwrap();
		assert!(db
			.list_scenario_logs(scenario.scenario_id)
			.await
			.unwrap()
			.is_empty());
	}

	#[test]
	fn test_attachment_path() {
		let mut component = scenario_component::Model {
			id: 1,
			name: "Rates".to_string(),
			description: String::new(),
			data_source_id: 1,
			created_by_id: None,
			created_date: now(),
			last_updated: None,
			file: Some("rates/2024.csv".to_string()),
		};
		let root = Path::new("models_files");
		assert_eq!(
			attachment_path(root, &component),
			Some(PathBuf::from("models_files/rates/2024.csv"))
		);

		component.file = Some("../secrets.txt".to_string());
		assert_eq!(attachment_path(root, &component), None);
		component.file = Some("/etc/passwd".to_string());
		assert_eq!(attachment_path(root, &component), None);
		component.file = None;
		assert_eq!(attachment_path(root, &component), None);
	}

	#[tokio::test]
	async fn test_data_source_in_use() {
		let db = test::load_database("data_source_in_use").await;

		let ofm = db.create_data_source("OFM").await.unwrap();
		let rates = component(&db, "Rates", ofm.id).await;
		let error = db.delete_data_source(ofm.id).await.unwrap_err();
		assert!(matches!(&*error, Error::ReferentialBlock(_)));
		assert!(db.find_data_source(ofm.id).await.unwrap().is_some());

		let mut updated = rates.clone();
		updated.file = Some("rates.csv".to_string());
		let updated = db.update_scenario_component(updated).await.unwrap();
		assert_eq!(updated.file.as_deref(), Some("rates.csv"));
		assert!(updated.last_updated >= rates.last_updated);

		db.delete_scenario_component(rates.id).await.unwrap();
		assert!(db.delete_data_source(ofm.id).await.unwrap());
	}
}
