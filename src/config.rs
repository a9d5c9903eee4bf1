use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use serde::*;


/// The file path of the configuration file, unless overridden by the
/// `PRODCAST_CONFIG` environment variable.
#[cfg(target_family = "unix")]
pub const CONFIG_FILE_PATH: &str = "/etc/prodcast/config.toml";
#[cfg(target_family = "windows")]
pub const CONFIG_FILE_PATH: &str = "C:\\Program Files\\prodcast\\config.toml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
	pub database_path: String,

	/// Name the worker reports itself with. Defaults to the host name.
	pub worker_name: Option<String>,
	/// The number of tasks that are run at the same time.
	pub worker_concurrency: usize,
	/// Time spent on every progress step of a scenario run.
	pub step_delay_ms: u64,
	/// How often an idle worker looks for new tasks.
	pub poll_interval_ms: u64,
	/// Directory that the files of scenario components are stored in.
	pub file_root: String,

	pub load_web_interface: Option<bool>,
	pub web_interface_port: Option<u16>,
}


impl Default for Config {
	fn default() -> Self {
		Self {
			database_path: "/var/lib/prodcast/db.sqlite".to_string(),
			worker_name: None,
			worker_concurrency: 2,
			step_delay_ms: 5000,
			poll_interval_ms: 1000,
			file_root: "models_files".to_string(),
			load_web_interface: None,
			web_interface_port: None,
		}
	}
}


lazy_static! {
	pub static ref CONFIG: OnceCell<Config> = OnceCell::new();
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_partial_config() {
		let config: Config = toml::from_str(
			r#"
			database_path = "/tmp/prodcast.sqlite"
			worker_concurrency = 4
			load_web_interface = true
			"#,
		)
		.unwrap();
		assert_eq!(config.database_path, "/tmp/prodcast.sqlite");
		assert_eq!(config.worker_concurrency, 4);
		assert_eq!(config.step_delay_ms, 5000);
		assert_eq!(config.file_root, "models_files");
		assert_eq!(config.load_web_interface, Some(true));
		assert_eq!(config.web_interface_port, None);
	}
}
