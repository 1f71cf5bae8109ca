use std::sync::Arc;
use std::time::Duration;

use zreport_core::clock::Clock;
use zreport_core::source::EventCache;
use zreport_zabbix::{ZabbixClient, ZabbixError};

use crate::auth::session::SessionStore;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Unauthenticated client, used for login, version checks and cookie
    /// verification.
    pub zabbix: ZabbixClient,
    /// Client carrying the shared API token, when one is configured.
    pub shared_client: Option<ZabbixClient>,
    pub sessions: Arc<SessionStore>,
    /// Event batches fetched with the shared token client, keyed by week
    /// range. Interactive sessions carry their own cache.
    pub event_cache: Arc<EventCache>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build the state from configuration. No remote call is made.
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, ZabbixError> {
        let zabbix = ZabbixClient::new(
            &config.zabbix.url,
            Duration::from_secs(config.zabbix.timeout_secs),
        )?;
        let shared_client = config
            .zabbix
            .token
            .as_deref()
            .map(|token| zabbix.with_api_token(token));

        let event_cache_ttl = Duration::from_secs(config.event_cache_ttl_secs);
        let sessions = SessionStore::new(
            chrono::Duration::minutes(config.session_ttl_mins),
            event_cache_ttl,
            Arc::clone(&clock),
        );
        let event_cache = EventCache::new(event_cache_ttl, Arc::clone(&clock));

        Ok(Self {
            config: Arc::new(config),
            zabbix,
            shared_client,
            sessions: Arc::new(sessions),
            event_cache: Arc::new(event_cache),
            clock,
        })
    }
}
