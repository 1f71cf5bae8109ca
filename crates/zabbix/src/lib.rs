//! Zabbix JSON-RPC access: client, payload normalization and the auth gate.

pub mod auth;
pub mod client;
pub mod error;
pub mod raw;

pub use auth::{authenticate, AuthError, AuthMode, AuthenticatedClient, Credentials};
pub use client::ZabbixClient;
pub use error::ZabbixError;
