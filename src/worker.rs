//! The worker pool that takes queued tasks off the task table and runs them.

use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use log::*;
use tokio::{spawn, task::JoinHandle, time::sleep};

use crate::{
	config::Config,
	db::{self, Database, ScenarioStore, TaskStore, RUN_SCENARIO_TASK},
	entity::{scenario::Status, task, task::State},
	runner::{RunRequest, ScenarioRunner, TaskProgress, TaskResult},
};


pub struct Worker {
	name: String,
	db: Database,
	runner: Arc<ScenarioRunner>,
	stop_flag: Arc<AtomicBool>,
	poll_interval: Duration,
}


/// Starts `worker_concurrency` workers that keep running until the stop flag
/// is set.
///
/// Runs that an earlier process on this host left behind are failed first.
pub async fn spawn_workers(
	db: Database, stop_flag: Arc<AtomicBool>, config: &Config,
) -> Vec<JoinHandle<()>> {
	let runner = Arc::new(ScenarioRunner::new(db.clone(), stop_flag.clone(), config));
	match recover_abandoned_tasks(&db, runner.host()).await {
		Ok(0) => {}
		Ok(count) => warn!("Failed {} tasks that were abandoned on {}.", count, runner.host()),
		Err(e) => error!("Unable to recover abandoned tasks: {}", e),
	}
	let count = config.worker_concurrency.max(1);
	info!("Starting {} workers on {}.", count, runner.host());

	(0..count)
		.map(|i| {
			let worker = Worker {
				name: format!("{}#{}", runner.host(), i),
				db: db.clone(),
				runner: runner.clone(),
				stop_flag: stop_flag.clone(),
				poll_interval: Duration::from_millis(config.poll_interval_ms),
			};
			spawn(async move {
				worker.run().await;
			})
		})
		.collect()
}

/// Fails the tasks that workers on this host still hold from before a
/// restart, together with the scenarios they were running.
pub async fn recover_abandoned_tasks(db: &Database, host: &str) -> db::Result<usize> {
	let tasks = db.list_claimed_tasks(&format!("{}#", host)).await?;
	for task in &tasks {
		let scenario = db.find_scenario(task.scenario_id).await?;
		if let Some(scenario) = scenario {
			let holds_scenario = scenario.status == Status::Started
				&& scenario.task_id.as_deref() == Some(task.task_id.as_str());
			if holds_scenario {
				db.finish_scenario(scenario.scenario_id, Status::Failure, None)
					.await?;
				db.append_scenario_log(
					scenario.scenario_id,
					"Task failed: worker restarted",
					task.progress,
				)
				.await?;
			}
		}

		let result = TaskResult {
			status: Status::Failure,
			scenario_id: task.scenario_id,
			error: Some("worker restarted".to_string()),
		};
		db.finish_task(&task.task_id, State::Failure, &serde_json::to_value(&result)?)
			.await?;
	}
	Ok(tasks.len())
}

fn task_state(status: Status) -> State {
	match status {
		Status::Pending => State::Pending,
		Status::Started => State::Started,
		Status::Success => State::Success,
		Status::Failure => State::Failure,
		Status::Revoked => State::Revoked,
	}
}


impl Worker {
	pub fn new(
		name: String, db: Database, runner: Arc<ScenarioRunner>, stop_flag: Arc<AtomicBool>,
		poll_interval: Duration,
	) -> Self {
		Self {
			name,
			db,
			runner,
			stop_flag,
			poll_interval,
		}
	}

	pub async fn run(&self) {
		debug!("Worker {} started.", self.name);
		while !self.stop_flag.load(Ordering::Relaxed) {
			match self.run_next().await {
				Ok(true) => {}
				Ok(false) => sleep(self.poll_interval).await,
				Err(e) => {
					error!("Worker {} is unable to process tasks: {}", self.name, e);
					sleep(self.poll_interval).await;
				}
			}
		}
		debug!("Worker {} stopped.", self.name);
	}

	/// Claims and processes the next task, if there is one. Returns whether a
	/// task was processed.
	pub async fn run_next(&self) -> db::Result<bool> {
		match self.db.claim_next_task(&self.name).await? {
			None => Ok(false),
			Some(task) => {
				self.process(task).await?;
				Ok(true)
			}
		}
	}

	/// Runs a claimed task and stores its outcome. Whatever happens to the
	/// scenario, the task ends up in a final state.
	pub async fn process(&self, task: task::Model) -> db::Result<task::Model> {
		if task.name != RUN_SCENARIO_TASK {
			warn!("Task {} has unknown name {}.", task.task_id, task.name);
			let result = serde_json::json!({ "error": format!("unknown task {}", task.name) });
			return self
				.db
				.finish_task(&task.task_id, State::Failure, &result)
				.await;
		}

		let request = RunRequest {
			scenario_id: task.scenario_id,
			start_date: task.start_date.clone(),
			end_date: task.end_date.clone(),
		};
		let progress = TaskProgress::new(self.db.clone(), task.task_id.clone());
		let result = match self.runner.run_scenario(&request, &progress).await {
			Ok(r) => r,
			Err(e) => {
				warn!("Task {} could not be started: {}", task.task_id, e);
				TaskResult {
					status: Status::Failure,
					scenario_id: task.scenario_id,
					error: Some(e.to_string()),
				}
			}
		};

		let value = serde_json::to_value(&result)?;
		self.db
			.finish_task(&task.task_id, task_state(result.status), &value)
			.await
	}
}
