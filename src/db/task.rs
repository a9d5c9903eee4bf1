//! The task queue. Tasks are submitted as rows in `worker_task`, claimed by
//! workers and updated with progress until they reach a final state.

use async_trait::async_trait;
use log::*;
use sea_orm::{prelude::*, *};
use uuid::Uuid;

use super::{expect_found, Error, PersistenceHandle, Result, ScenarioStore};
use crate::{
	common::now,
	entity::{task, task::State},
	trace,
};


/// The name under which scenario runs are queued.
pub const RUN_SCENARIO_TASK: &str = "worker.run_scenario";


#[async_trait]
pub trait TaskStore: PersistenceHandle {
	/// Queues a run of the given scenario, and remembers the task on the
	/// scenario.
	async fn enqueue_run_scenario(
		&self, scenario_id: i64, start_date: &str, end_date: &str,
	) -> Result<task::Model> {
		expect_found(self.find_scenario(scenario_id).await?, "scenario", scenario_id)?;

		let timestamp = now();
		let record = task::ActiveModel {
			task_id: Set(Uuid::new_v4().to_string()),
			name: Set(RUN_SCENARIO_TASK.to_string()),
			scenario_id: Set(scenario_id),
			start_date: Set(start_date.to_string()),
			end_date: Set(end_date.to_string()),
			state: Set(State::Pending),
			progress: Set(0),
			revoke_requested: Set(false),
			worker: Set(None),
			result: Set(None),
			created: Set(timestamp),
			updated: Set(timestamp),
		};
		let task = record.insert(self.inner()).await?;
		self.set_scenario_task(scenario_id, &task.task_id).await?;
		debug!("Queued task {} for scenario {}.", task.task_id, scenario_id);
		Ok(task)
	}

	async fn find_task(&self, task_id: &str) -> Result<Option<task::Model>> {
		Ok(task::Entity::find_by_id(task_id.to_string())
			.one(self.inner())
			.await?)
	}

	async fn list_scenario_tasks(&self, scenario_id: i64) -> Result<Vec<task::Model>> {
		Ok(task::Entity::find()
			.filter(task::Column::ScenarioId.eq(scenario_id))
			.order_by_asc(task::Column::Created)
			.all(self.inner())
			.await?)
	}

	/// Takes the oldest pending task for the given worker, if there is one.
	///
	/// A task is only handed out once, even when multiple workers go for the
	/// same task at the same time.
	async fn claim_next_task(&self, worker: &str) -> Result<Option<task::Model>> {
		loop {
			let candidate = task::Entity::find()
				.filter(task::Column::State.eq(State::Pending))
				.order_by_asc(task::Column::Created)
				.one(self.inner())
				.await?;
			let candidate = match candidate {
				None => return Ok(None),
				Some(t) => t,
			};

			let changes = task::ActiveModel {
				state: Set(State::Started),
				worker: Set(Some(worker.to_string())),
				updated: Set(now()),
				..Default::default()
			};
			let result = task::Entity::update_many()
				.set(changes)
				.filter(task::Column::TaskId.eq(candidate.task_id.clone()))
				.filter(task::Column::State.eq(State::Pending))
				.exec(self.inner())
				.await?;
			if result.rows_affected > 0 {
				let task = self.find_task(&candidate.task_id).await?;
				return Ok(task);
			}
			trace!("Task {} was claimed by someone else.", candidate.task_id);
		}
	}

	/// Lists the tasks that are still marked as started by any worker whose
	/// name begins with the given prefix.
	async fn list_claimed_tasks(&self, worker_prefix: &str) -> Result<Vec<task::Model>> {
		Ok(task::Entity::find()
			.filter(task::Column::State.eq(State::Started))
			.filter(task::Column::Worker.starts_with(worker_prefix))
			.order_by_asc(task::Column::Created)
			.all(self.inner())
			.await?)
	}

	async fn store_task_progress(&self, task_id: &str, progress: i32) -> Result<()> {
		if !(0..=100).contains(&progress) {
			return trace::err(Error::InvalidProgress(progress));
		}
		task::Entity::update_many()
			.col_expr(task::Column::Progress, Expr::value(progress))
			.col_expr(task::Column::Updated, Expr::value(now()))
			.filter(task::Column::TaskId.eq(task_id))
			.exec(self.inner())
			.await?;
		Ok(())
	}

	/// Puts a task in its final state, together with the result it produced.
	async fn finish_task(
		&self, task_id: &str, state: State, result: &serde_json::Value,
	) -> Result<task::Model> {
		let existing = expect_found(self.find_task(task_id).await?, "task", task_id)?;
		let mut record: task::ActiveModel = existing.into();
		record.state = Set(state);
		record.result = Set(Some(serde_json::to_string(result)?));
		record.updated = Set(now());
		Ok(record.update(self.inner()).await?)
	}

	/// Asks for a task to be stopped. A task that hasn't been picked up yet is
	/// revoked right away, a running task is revoked by its worker at the next
	/// progress step. Finished tasks are left as they are.
	async fn request_task_revoke(&self, task_id: &str) -> Result<task::Model> {
		let existing = expect_found(self.find_task(task_id).await?, "task", task_id)?;
		if existing.state.is_terminal() {
			debug!("Task {} has already finished.", task_id);
			return Ok(existing);
		}

		let pending = existing.state == State::Pending;
		let mut record: task::ActiveModel = existing.into();
		if pending {
			record.state = Set(State::Revoked);
		}
		record.revoke_requested = Set(true);
		record.updated = Set(now());
		Ok(record.update(self.inner()).await?)
	}

	async fn is_revoke_requested(&self, task_id: &str) -> Result<bool> {
		let task = expect_found(self.find_task(task_id).await?, "task", task_id)?;
		Ok(task.revoke_requested)
	}
}

impl<T> TaskStore for T where T: PersistenceHandle {}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		db::{Error, NewScenario},
		test,
	};

	#[tokio::test]
	async fn test_task_is_claimed_once() {
		let db = test::load_database("task_claim").await;

		let scenario = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		let task = db
			.enqueue_run_scenario(scenario.scenario_id, "2024-01-01", "2024-01-31")
			.await
			.unwrap();
		assert_eq!(task.state, State::Pending);
		assert_eq!(task.name, RUN_SCENARIO_TASK);
		let scenario = db
			.find_scenario(scenario.scenario_id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(scenario.task_id.as_deref(), Some(task.task_id.as_str()));

		let claimed = db.claim_next_task("worker-1").await.unwrap().unwrap();
		assert_eq!(claimed.task_id, task.task_id);
		assert_eq!(claimed.state, State::Started);
		assert_eq!(claimed.worker.as_deref(), Some("worker-1"));
		assert!(db.claim_next_task("worker-2").await.unwrap().is_none());

		db.store_task_progress(&task.task_id, 40).await.unwrap();
		assert_eq!(
			db.find_task(&task.task_id).await.unwrap().unwrap().progress,
			40
		);

		let result = serde_json::json!({"status": "SUCCESS", "scenario_id": scenario.scenario_id});
		let finished = db
			.finish_task(&task.task_id, State::Success, &result)
			.await
			.unwrap();
		assert_eq!(finished.state, State::Success);
		let stored: serde_json::Value =
			serde_json::from_str(finished.result.as_deref().unwrap()).unwrap();
		assert_eq!(stored, result);
	}

	#[tokio::test]
	async fn test_revoke_pending_task() {
		let db = test::load_database("task_revoke").await;

		let scenario = db
			.create_scenario(NewScenario {
				name: "Base case".to_string(),
				..Default::default()
			})
			.await
			.unwrap();
		let task = db
			.enqueue_run_scenario(scenario.scenario_id, "2024-01-01", "2024-01-31")
			.await
			.unwrap();
		let revoked = db.request_task_revoke(&task.task_id).await.unwrap();
		assert_eq!(revoked.state, State::Revoked);

		// Nothing left to pick up
		assert!(db.claim_next_task("worker-1").await.unwrap().is_none());

		let error = db.enqueue_run_scenario(9999, "a", "b").await.unwrap_err();
		assert!(matches!(&*error, Error::NotFound(..)));
	}
}
