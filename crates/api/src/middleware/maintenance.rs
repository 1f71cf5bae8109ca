//! Maintenance mode.
//!
//! While `DENY_GUI_ACCESS` is set, every request except `GET /health`
//! answers 503 with the configured message. Peers on the allow list are
//! let through. The peer address comes from the connection, not from
//! forwarding headers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Paths that stay reachable during maintenance.
const EXEMPT_PATHS: &[&str] = &["/health"];

pub async fn maintenance_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let maintenance = &state.config.maintenance;
    if !maintenance.deny_access || EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if peer.is_some_and(|ip| maintenance.allowed_ips.contains(&ip)) {
        return next.run(request).await;
    }

    tracing::debug!(?peer, path = %request.uri().path(), "Rejected during maintenance");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": maintenance.message,
            "code": "MAINTENANCE",
        })),
    )
        .into_response()
}
