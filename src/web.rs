//! A small JSON API to submit scenario runs and follow their progress.

mod common;

use std::{
	io,
	net::*,
	sync::{atomic::*, Arc},
	time::Duration,
};

use ::serde::*;
use axum::{
	extract::*,
	response::Response,
	routing::{get, post},
	Router,
};
use log::*;
use thiserror::Error;
use tokio::time::sleep;

use self::common::*;
use crate::{
	config::Config,
	db::{attachment_path, Database, ScenarioStore, TaskStore},
	entity::{scenario_component, scenario_log, task},
};


pub struct Global {
	pub config: Config,
	pub db: Database,
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("unable to bind to port {0}: {1}")]
	Bind(u16, io::Error),
	#[error("web server stopped: {0}")]
	Serve(io::Error),
}

#[derive(Deserialize)]
struct RunBody {
	start_date: String,
	end_date: String,
}

#[derive(Serialize)]
struct Submitted {
	task_id: String,
}

#[derive(Serialize)]
struct TaskStatus {
	task_id: String,
	state: task::State,
	progress: i32,
	result: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct LinkedComponent {
	#[serde(flatten)]
	component: scenario_component::Model,
	/// Location of the attached file on this worker.
	file_path: Option<String>,
}

#[derive(Default, Deserialize)]
struct ServerQuery {
	all: Option<bool>,
}


pub fn router(global: Arc<Global>) -> Router {
	Router::new()
		.route("/api/scenarios/:id", get(scenario))
		.route("/api/scenarios/:id/run", post(run_scenario))
		.route("/api/scenarios/:id/logs", get(scenario_logs))
		.route("/api/scenarios/:id/components", get(scenario_components))
		.route("/api/tasks/:task_id", get(task_status))
		.route("/api/tasks/:task_id/revoke", post(revoke_task))
		.route("/api/servers", get(servers))
		.with_state(global)
}

pub async fn serve(stop_flag: Arc<AtomicBool>, port: u16, global: Arc<Global>) -> Result<(), Error> {
	let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
	let app = router(global);

	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.map_err(|e| Error::Bind(port, e))?;
	info!("Serving the web interface on port {}.", port);
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			while !stop_flag.load(Ordering::Relaxed) {
				sleep(Duration::from_secs(1)).await;
			}
		})
		.await
		.map_err(Error::Serve)
}

impl From<task::Model> for TaskStatus {
	fn from(other: task::Model) -> Self {
		let result = other
			.result
			.as_deref()
			.and_then(|r| serde_json::from_str(r).ok());
		Self {
			task_id: other.task_id,
			state: other.state,
			progress: other.progress,
			result,
		}
	}
}

async fn scenario(State(g): State<Arc<Global>>, Path(id): Path<i64>) -> Response {
	match g.db.find_scenario(id).await {
		Ok(Some(s)) => json_response(200, &s),
		Ok(None) => not_found_error_response("Scenario not found"),
		Err(e) => db_error_response(e, "Unable to load scenario"),
	}
}

async fn run_scenario(
	State(g): State<Arc<Global>>, Path(id): Path<i64>, Json(body): Json<RunBody>,
) -> Response {
	match g
		.db
		.enqueue_run_scenario(id, &body.start_date, &body.end_date)
		.await
	{
		Ok(task) => {
			info!("Scenario {} submitted as task {}.", id, task.task_id);
			json_response(
				202,
				&Submitted {
					task_id: task.task_id,
				},
			)
		}
		Err(e) => db_error_response(e, "Unable to submit scenario"),
	}
}

async fn scenario_logs(State(g): State<Arc<Global>>, Path(id): Path<i64>) -> Response {
	match g.db.find_scenario(id).await {
		Ok(Some(_)) => {}
		Ok(None) => return not_found_error_response("Scenario not found"),
		Err(e) => return db_error_response(e, "Unable to load scenario"),
	}

	let logs: Vec<scenario_log::Model> = match g.db.list_scenario_logs(id).await {
		Ok(l) => l,
		Err(e) => return db_error_response(e, "Unable to load scenario logs"),
	};
	json_response(200, &logs)
}

async fn scenario_components(State(g): State<Arc<Global>>, Path(id): Path<i64>) -> Response {
	match g.db.find_scenario(id).await {
		Ok(Some(_)) => {}
		Ok(None) => return not_found_error_response("Scenario not found"),
		Err(e) => return db_error_response(e, "Unable to load scenario"),
	}

	let file_root = std::path::Path::new(&g.config.file_root);
	match g.db.list_linked_components(id).await {
		Ok(components) => {
			let linked: Vec<LinkedComponent> = components
				.into_iter()
				.map(|component| LinkedComponent {
					file_path: attachment_path(file_root, &component)
						.map(|p| p.display().to_string()),
					component,
				})
				.collect();
			json_response(200, &linked)
		}
		Err(e) => db_error_response(e, "Unable to load scenario components"),
	}
}

async fn task_status(State(g): State<Arc<Global>>, Path(task_id): Path<String>) -> Response {
	match g.db.find_task(&task_id).await {
		Ok(Some(t)) => json_response(200, &TaskStatus::from(t)),
		Ok(None) => not_found_error_response("Task not found"),
		Err(e) => db_error_response(e, "Unable to load task"),
	}
}

async fn revoke_task(State(g): State<Arc<Global>>, Path(task_id): Path<String>) -> Response {
	match g.db.request_task_revoke(&task_id).await {
		Ok(t) => json_response(200, &TaskStatus::from(t)),
		Err(e) => db_error_response(e, "Unable to revoke task"),
	}
}

async fn servers(State(g): State<Arc<Global>>, Query(query): Query<ServerQuery>) -> Response {
	let result = if query.all.unwrap_or(false) {
		g.db.list_all_servers().await
	} else {
		g.db.list_active_servers().await
	};
	match result {
		Ok(servers) => json_response(200, &servers),
		Err(e) => db_error_response(e, "Unable to load servers"),
	}
}
