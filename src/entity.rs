//! Table definitions.
//!
//! Table and column names follow the legacy `apiapp_*` schema so that an
//! existing database can be opened as is.

pub mod data_source;
pub mod main_record;
pub mod object_instance;
pub mod object_type;
pub mod object_type_property;
pub mod scenario;
pub mod scenario_component;
pub mod scenario_component_link;
pub mod scenario_log;
pub mod server;
pub mod task;
pub mod unit_category;
pub mod unit_definition;
pub mod unit_system;
pub mod unit_system_category_definition;
pub mod unit_type;
pub mod user;
