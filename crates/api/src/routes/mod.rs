//! Route tree. `/health` sits at the root; everything else is nested under
//! `/api/v1`.

pub mod auth;
pub mod health;
pub mod reports;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
///
/// ```text
/// /auth     -> login, logout, verify
/// /reports  -> events, top-hosts, host-events, top-items, trend, filters
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/reports", reports::router())
}
