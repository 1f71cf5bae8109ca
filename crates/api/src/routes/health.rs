use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use zreport_core::cache::CacheStats;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the Zabbix API answered the version request.
    pub zabbix_healthy: bool,
    pub zabbix_version: Option<String>,
    pub auth_mode: &'static str,
    pub event_cache: CacheStats,
}

/// GET /health -- returns service and Zabbix reachability.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let zabbix_version = match state.zabbix.api_version().await {
        Ok(version) => Some(version),
        Err(e) => {
            tracing::warn!(error = %e, "Zabbix health check failed");
            None
        }
    };
    let zabbix_healthy = zabbix_version.is_some();

    Json(HealthResponse {
        status: if zabbix_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        zabbix_healthy,
        zabbix_version,
        auth_mode: state.config.auth_mode.as_str(),
        event_cache: state.event_cache.stats(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
