//! Request gates.
//!
//! - [`auth::ReportClient`] -- Resolves the Zabbix client a report request runs with.
//! - [`maintenance::maintenance_gate`] -- Answers 503 while maintenance mode is on.

pub mod auth;
pub mod maintenance;
