//! Runs scenarios.
//!
//! A run claims its scenario, walks through the progress steps while writing
//! a log row for each of them, and always leaves the scenario in a final
//! state: `SUCCESS`, `FAILURE` or `REVOKED`.

use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use async_trait::async_trait;
use log::*;
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, time::sleep};

use crate::{
	config::Config,
	db::{self, Database, ScenarioStore, TaskStore},
	entity::{scenario, scenario::Status},
};


/// Progress is reported in steps of this many percent.
pub const PROGRESS_STEP: i32 = 10;


#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RunRequest {
	pub scenario_id: i64,
	/// Opaque label, not parsed.
	pub start_date: String,
	/// Opaque label, not parsed.
	pub end_date: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TaskResult {
	pub status: Status,
	pub scenario_id: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Receives the progress of a run as it happens, and tells the run when it
/// should stop.
#[async_trait]
pub trait ProgressPublisher: Send + Sync {
	async fn publish(&self, progress: i32);

	async fn cancellation_requested(&self) -> bool { false }
}

/// Publishes progress onto the task's row, where it can be polled by task id.
pub struct TaskProgress {
	db: Database,
	task_id: String,
}

/// Publishes progress to in-process subscribers.
pub struct ProgressChannel {
	sender: watch::Sender<i32>,
	cancelled: AtomicBool,
}

pub struct ScenarioRunner {
	db: Database,
	stop_flag: Arc<AtomicBool>,
	step_delay: Duration,
	host: String,
}

enum Outcome {
	Finished,
	Revoked,
}


/// The name this worker identifies itself with.
pub fn worker_name(config: &Config) -> String {
	if let Some(name) = &config.worker_name {
		return name.clone();
	}
	match hostname::get() {
		Ok(name) => name.to_string_lossy().to_string(),
		Err(e) => {
			warn!("Unable to determine host name: {}", e);
			"localhost".to_string()
		}
	}
}

pub fn describe_run(request: &RunRequest) -> String {
	format!(
		"Calculated from {} to {}",
		request.start_date, request.end_date
	)
}


impl TaskProgress {
	pub fn new(db: Database, task_id: String) -> Self { Self { db, task_id } }
}

#[async_trait]
impl ProgressPublisher for TaskProgress {
	async fn publish(&self, progress: i32) {
		if let Err(e) = self.db.store_task_progress(&self.task_id, progress).await {
			warn!("Unable to store progress of task {}: {}", self.task_id, e);
		}
	}

	async fn cancellation_requested(&self) -> bool {
		match self.db.is_revoke_requested(&self.task_id).await {
			Ok(requested) => requested,
			Err(e) => {
				warn!("Unable to check task {} for revocation: {}", self.task_id, e);
				false
			}
		}
	}
}

impl ProgressChannel {
	pub fn new() -> Self {
		let (sender, _) = watch::channel(0);
		Self {
			sender,
			cancelled: AtomicBool::new(false),
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<i32> { self.sender.subscribe() }

	pub fn cancel(&self) { self.cancelled.store(true, Ordering::Relaxed); }
}

impl Default for ProgressChannel {
	fn default() -> Self { Self::new() }
}

#[async_trait]
impl ProgressPublisher for ProgressChannel {
	async fn publish(&self, progress: i32) { self.sender.send_replace(progress); }

	async fn cancellation_requested(&self) -> bool { self.cancelled.load(Ordering::Relaxed) }
}

impl ScenarioRunner {
	pub fn new(db: Database, stop_flag: Arc<AtomicBool>, config: &Config) -> Self {
		Self {
			db,
			stop_flag,
			step_delay: Duration::from_millis(config.step_delay_ms),
			host: worker_name(config),
		}
	}

	pub fn host(&self) -> &str { &self.host }

	async fn should_stop(&self, progress: &dyn ProgressPublisher) -> bool {
		self.stop_flag.load(Ordering::Relaxed) || progress.cancellation_requested().await
	}

	/// Runs a scenario from start to finish.
	///
	/// Only a scenario that can't be claimed, because it doesn't exist or is
	/// already running, results in an error. Once claimed, any fault ends the
	/// run in `FAILURE` with a log row explaining why, and is reported in the
	/// returned result instead.
	pub async fn run_scenario(
		&self, request: &RunRequest, progress: &dyn ProgressPublisher,
	) -> db::Result<TaskResult> {
		let scenario_id = request.scenario_id;
		let scenario = self.db.start_scenario(scenario_id).await?;
		info!("Running scenario {} on {}.", scenario_id, self.host);

		let mut reached = 0;
		let (status, error) = match self
			.execute(&scenario, request, progress, &mut reached)
			.await
		{
			Ok(Outcome::Finished) => {
				info!("Scenario {} finished.", scenario_id);
				(Status::Success, None)
			}
			Ok(Outcome::Revoked) => {
				info!("Scenario {} revoked at {}%.", scenario_id, reached);
				self.conclude(scenario_id, Status::Revoked, "Task revoked", reached)
					.await;
				(Status::Revoked, None)
			}
			Err(e) => {
				error!("Scenario {} failed: {}", scenario_id, e);
				let message = format!("Task failed: {}", e);
				self.conclude(scenario_id, Status::Failure, &message, reached)
					.await;
				(Status::Failure, Some(e.to_string()))
			}
		};

		Ok(TaskResult {
			status,
			scenario_id,
			error,
		})
	}

	async fn execute(
		&self, scenario: &scenario::Model, request: &RunRequest, progress: &dyn ProgressPublisher,
		reached: &mut i32,
	) -> db::Result<Outcome> {
		let scenario_id = scenario.scenario_id;
		if let Some(server_id) = scenario.server_id {
			self.db.record_server_host(server_id, &self.host).await?;
		}

		self.db
			.append_scenario_log(scenario_id, "Task started", 0)
			.await?;
		progress.publish(0).await;

		let mut current = PROGRESS_STEP;
		while current <= 100 {
			if self.should_stop(progress).await {
				return Ok(Outcome::Revoked);
			}
			sleep(self.step_delay).await;

			self.db
				.append_scenario_log(scenario_id, &format!("Progress: {}%", current), current)
				.await?;
			progress.publish(current).await;
			*reached = current;
			debug!("Scenario {} at {}%.", scenario_id, current);
			current += PROGRESS_STEP;
		}

		self.db
			.append_scenario_log(scenario_id, "Task finished", 100)
			.await?;
		self.db
			.finish_scenario(scenario_id, Status::Success, Some(describe_run(request)))
			.await?;
		Ok(Outcome::Finished)
	}

	/// Puts the scenario in its final state after the run has been cut short.
	/// Errors are only logged, as there is nobody left to report them to.
	async fn conclude(&self, scenario_id: i64, status: Status, message: &str, reached: i32) {
		if let Err(e) = self.db.finish_scenario(scenario_id, status, None).await {
			error!(
				"Unable to mark scenario {} as {:?}: {}",
				scenario_id, status, e
			);
		}
		if let Err(e) = self
			.db
			.append_scenario_log(scenario_id, message, reached)
			.await
		{
			error!("Unable to log the end of scenario {}: {}", scenario_id, e);
		}
	}
}
