pub mod common;
pub mod config;
pub mod db;
pub mod entity;
pub mod migration;
pub mod runner;
pub mod test;
pub mod trace;
pub mod units;
pub mod web;
pub mod worker;
