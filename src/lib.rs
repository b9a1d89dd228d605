// Library for tests to access modules

pub mod cache;
pub mod census;
pub mod config;
pub mod downtime;
pub mod event_log;
pub mod host_info;
pub mod models;
pub mod monitor;
pub mod probe;
pub mod routes;
pub mod sysinfo_repo;
pub mod traffic;
pub mod version;
pub mod worker;
