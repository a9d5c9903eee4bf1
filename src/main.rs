use std::{
	env, fmt,
	fs::File,
	io::{self, prelude::*},
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use log::*;
use prodcast_worker::{
	config::{self, Config, CONFIG},
	db::{Database, PersistenceHandle},
	migration::Migrations,
	web, worker,
};
use signal_hook::flag;
use tokio::{spawn, time::sleep};


fn config_path() -> PathBuf {
	match env::var_os("PRODCAST_CONFIG") {
		Some(path) => PathBuf::from(path),
		None => PathBuf::from(config::CONFIG_FILE_PATH),
	}
}

fn initialize_logging() {
	let result = env::var_os("SYSTEM_LOG_FILE").map(PathBuf::from);

	if let Some(filename) = result {
		if let Err(e) = simple_logging::log_to_file(&filename, LevelFilter::Debug) {
			eprintln!("Unable to log to {}: {}", filename.display(), e);
			env_logger::init();
		}
	} else {
		env_logger::init()
	}
}

fn load_config<P>(path: P) -> Option<Config>
where
	P: AsRef<Path> + fmt::Debug,
{
	let mut file = match File::open(&path) {
		Err(e) => match e.kind() {
			io::ErrorKind::NotFound => {
				error!("Config file {:?} not found!", path);
				return None;
			}
			_ => {
				error!("Unable to open config file {:?}: {}", path, e);
				return None;
			}
		},
		Ok(f) => f,
	};

	let mut content = String::new();
	if let Err(e) = file.read_to_string(&mut content) {
		error!("Unable to read config file {:?}: {}", path, e);
		return None;
	}

	match toml::from_str(&content) {
		Err(e) => {
			error!("Unable to parse config file {:?}: {}", path, e);
			None
		}
		Ok(c) => Some(c),
	}
}

async fn load_database(config: &Config) -> io::Result<Database> {
	// If the folder doesn't exist yet, create it
	let db_path = PathBuf::from(&config.database_path);
	if let Some(parent) = db_path.parent() {
		if !parent.as_os_str().is_empty() {
			tokio::fs::create_dir_all(parent).await?;
		}
	}

	let db = Database::load(db_path)
		.await
		.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
	Ok(db)
}

#[tokio::main]
async fn main() {
	initialize_logging();

	// Load config
	let config_path = config_path();
	let config = match load_config(&config_path) {
		Some(c) => c,
		None => return,
	};
	if CONFIG.set(config.clone()).is_err() {
		error!("Unable to set config global.");
		return;
	}

	// Catch signals
	let stop_flag = Arc::new(AtomicBool::new(false));
	for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
		if let Err(e) = flag::register(signal, stop_flag.clone()) {
			error!("Unable to register signal handler: {}", e);
			return;
		}
	}
	let stop_flag2 = stop_flag.clone();
	if let Err(e) = ctrlc::set_handler(move || {
		stop_flag2.store(true, Ordering::Relaxed);
	}) {
		warn!("Unable to set Ctrl-C handler: {}", e);
	}

	// Load database
	let db = match load_database(&config).await {
		Ok(db) => db,
		Err(e) => {
			error!("Unable to load database: {}", e);
			return;
		}
	};

	// Run migrations (does nothing if there is nothing to migrate)
	if let Err(e) = Migrations::load().run(db.inner()).await {
		error!("Unable to migrate database: {:?}", e);
		return;
	}

	let workers = worker::spawn_workers(db.clone(), stop_flag.clone(), &config).await;

	// Spawn web server
	if config.load_web_interface.unwrap_or(false) {
		let global = Arc::new(web::Global {
			config: config.clone(),
			db: db.clone(),
		});
		let port = config.web_interface_port.unwrap_or(8080);
		let stop_flag2 = stop_flag.clone();
		spawn(async move {
			if let Err(e) = web::serve(stop_flag2, port, global).await {
				error!("{}", e);
			}
		});
	}

	// Wait for a signal
	while !stop_flag.load(Ordering::Relaxed) {
		sleep(Duration::from_secs(1)).await;
	}

	info!("Exiting prodcast-worker...");
	for handle in workers {
		if let Err(e) = handle.await {
			error!("Worker panicked: {}", e);
		}
	}
	if let Err(e) = db.close().await {
		error!("Unable to close database: {}", e);
	}
	info!("Done.");
}
