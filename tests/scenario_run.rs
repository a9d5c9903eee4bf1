use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use log::*;
use prodcast_worker::{
	config::Config,
	db::*,
	entity::{scenario::Status, task},
	runner::TaskResult,
	test::*,
	worker,
};
use tokio::time::sleep;

#[cfg(test)]
#[ctor::ctor]
fn initialize() {
	env_logger::init();
}


async fn wait_until_finished(db: &Database, task_id: &str) -> task::Model {
	for _ in 0..500 {
		let task = db.find_task(task_id).await.unwrap().unwrap();
		if task.state.is_terminal() {
			return task;
		}
		sleep(Duration::from_millis(20)).await;
	}
	panic!("task {} did not finish in time", task_id);
}

async fn create_scenario(db: &Database, name: &str) -> i64 {
	db.create_scenario(NewScenario {
		name: name.to_string(),
		..Default::default()
	})
	.await
	.unwrap()
	.scenario_id
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_run_end_to_end() {
	let db = load_database("end_to_end").await;
	let stop_flag = Arc::new(AtomicBool::new(false));
	let config = Config {
		worker_concurrency: 2,
		..test_config()
	};

	let scenario_id = create_scenario(&db, "Base case").await;
	let other_id = create_scenario(&db, "High case").await;
	let workers = worker::spawn_workers(db.clone(), stop_flag.clone(), &config).await;

	let task = db
		.enqueue_run_scenario(scenario_id, "2024-01-01", "2024-01-31")
		.await
		.unwrap();
	let other = db
		.enqueue_run_scenario(other_id, "2025-01-01", "2025-06-30")
		.await
		.unwrap();
	let task = wait_until_finished(&db, &task.task_id).await;
	let other = wait_until_finished(&db, &other.task_id).await;
	stop_flag.store(true, Ordering::Relaxed);
	for handle in workers {
		handle.await.unwrap();
	}

	assert_eq!(task.state, task::State::Success);
	assert_eq!(task.progress, 100);
	let result: TaskResult = serde_json::from_str(task.result.as_deref().unwrap()).unwrap();
	assert_eq!(result.status, Status::Success);
	assert_eq!(result.scenario_id, scenario_id);
	assert_eq!(other.state, task::State::Success);

	let logs = db.list_scenario_logs(scenario_id).await.unwrap();
	info!("Scenario {} left {} log rows.", scenario_id, logs.len());
	assert_eq!(logs.len(), 12);
	let progress: Vec<i32> = logs.iter().map(|l| l.progress).collect();
	assert_eq!(progress, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 100]);

	let scenario = db.find_scenario(scenario_id).await.unwrap().unwrap();
	assert_eq!(scenario.status, Status::Success);
	assert!(scenario.start_date.is_some());
	assert!(scenario.end_date.is_some());
	assert!(scenario.description.contains("2024-01-01"));
	assert!(scenario.description.contains("2024-01-31"));
	assert_eq!(scenario.task_id.as_deref(), Some(task.task_id.as_str()));

	// The runs didn't mix their logs
	assert_eq!(db.list_scenario_logs(other_id).await.unwrap().len(), 12);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_revoke_running_scenario() {
	let db = load_database("revoke_running").await;
	let stop_flag = Arc::new(AtomicBool::new(false));
	let config = Config {
		worker_concurrency: 1,
		step_delay_ms: 50,
		..test_config()
	};

	let scenario_id = create_scenario(&db, "Base case").await;
	let workers = worker::spawn_workers(db.clone(), stop_flag.clone(), &config).await;
	let task = db
		.enqueue_run_scenario(scenario_id, "2024-01-01", "2024-01-31")
		.await
		.unwrap();

	// Wait for the run to get going
	for _ in 0..500 {
		let current = db.find_task(&task.task_id).await.unwrap().unwrap();
		if current.progress >= 10 {
			break;
		}
		sleep(Duration::from_millis(10)).await;
	}
	db.request_task_revoke(&task.task_id).await.unwrap();

	let task = wait_until_finished(&db, &task.task_id).await;
	stop_flag.store(true, Ordering::Relaxed);
	for handle in workers {
		handle.await.unwrap();
	}

	assert_eq!(task.state, task::State::Revoked);
	assert!(task.progress < 100);
	let scenario = db.find_scenario(scenario_id).await.unwrap().unwrap();
	assert_eq!(scenario.status, Status::Revoked);
	assert!(scenario.end_date.is_some());

	let logs = db.list_scenario_logs(scenario_id).await.unwrap();
	let last = logs.last().unwrap();
	assert_eq!(last.message, "Task revoked");
	assert_eq!(last.progress, task.progress);
	assert!(logs.iter().all(|l| l.message != "Task finished"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_flag_interrupts_run() {
	let db = load_database("stop_flag").await;
	let stop_flag = Arc::new(AtomicBool::new(false));
	let config = Config {
		worker_concurrency: 1,
		step_delay_ms: 50,
		..test_config()
	};

	let scenario_id = create_scenario(&db, "Base case").await;
	let workers = worker::spawn_workers(db.clone(), stop_flag.clone(), &config).await;
	let task = db
		.enqueue_run_scenario(scenario_id, "2024-01-01", "2024-01-31")
		.await
		.unwrap();
	for _ in 0..500 {
		let current = db.find_task(&task.task_id).await.unwrap().unwrap();
		if current.state == task::State::Started {
			break;
		}
		sleep(Duration::from_millis(10)).await;
	}

	// Shutting down doesn't leave the scenario hanging in STARTED
	stop_flag.store(true, Ordering::Relaxed);
	for handle in workers {
		handle.await.unwrap();
	}
	let task = db.find_task(&task.task_id).await.unwrap().unwrap();
	assert_eq!(task.state, task::State::Revoked);
	let scenario = db.find_scenario(scenario_id).await.unwrap().unwrap();
	assert_eq!(scenario.status, Status::Revoked);
}
