//! Route definitions for the `/reports` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Routes mounted at `/reports`. All accept `?week=&severities=&tags=`.
///
/// ```text
/// GET /events       -> filtered raw listing
/// GET /top-hosts    -> top 20 hosts by event count
/// GET /host-events  -> counts per host and event name
/// GET /top-items    -> top 20 items by event count
/// GET /trend        -> weekly totals (also ?include_current=)
/// GET /filters      -> severities and tags present in the week
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(reports::events))
        .route("/top-hosts", get(reports::hosts))
        .route("/host-events", get(reports::host_events))
        .route("/top-items", get(reports::items))
        .route("/trend", get(reports::trend))
        .route("/filters", get(reports::filters))
}
