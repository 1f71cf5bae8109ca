//! Handlers for the `/reports` resource.
//!
//! Every view resolves the query, fetches the selected week through the
//! event cache, and runs one pipeline over the batch. Filters are applied
//! after the fetch, so views of the same week share one remote call.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use zreport_core::aggregate::{
    filter_options, host_event_counts, raw_listing, top_hosts, top_items, FilterOptions,
    HostCount, HostEventCount, ItemEventCount, WeekTrend,
};
use zreport_core::event::Event;
use zreport_core::report::{week_trend, TrendWindow};
use zreport_core::source::{CachedSource, EventBatch, EventSource};
use zreport_core::week::WeekRange;

use crate::error::AppResult;
use crate::middleware::auth::ReportClient;
use crate::query::{ReportQuery, ResolvedQuery};
use crate::response::{DataResponse, ReportBody};
use crate::state::AppState;

type ReportResponse<T> = Json<DataResponse<ReportBody<T>>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_week(
    state: &AppState,
    source: &ReportClient,
    query: &ReportQuery,
) -> AppResult<(ResolvedQuery, EventBatch)> {
    let resolved = query.resolve(state.clock.now(), state.config.utc_offset)?;
    let events = CachedSource::new(&source.cache, &source.client)
        .fetch_events(resolved.range)
        .await?;
    Ok((resolved, events))
}

fn respond<T: Serialize>(resolved: ResolvedQuery, rows: T) -> ReportResponse<T> {
    Json(DataResponse {
        data: ReportBody {
            week: resolved.week,
            range: resolved.range,
            filters: resolved.filters,
            rows,
        },
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/reports/events
///
/// The week's events that pass the filters, newest first.
pub async fn events(
    State(state): State<AppState>,
    source: ReportClient,
    query: ReportQuery,
) -> AppResult<ReportResponse<Vec<Event>>> {
    let (resolved, events) = load_week(&state, &source, &query).await?;
    let rows = raw_listing(&events, &resolved.filters);
    Ok(respond(resolved, rows))
}

/// GET /api/v1/reports/top-hosts
pub async fn hosts(
    State(state): State<AppState>,
    source: ReportClient,
    query: ReportQuery,
) -> AppResult<ReportResponse<Vec<HostCount>>> {
    let (resolved, events) = load_week(&state, &source, &query).await?;
    let rows = top_hosts(&events, &resolved.filters);
    Ok(respond(resolved, rows))
}

/// GET /api/v1/reports/host-events
///
/// Event counts per host and event name, untruncated.
pub async fn host_events(
    State(state): State<AppState>,
    source: ReportClient,
    query: ReportQuery,
) -> AppResult<ReportResponse<Vec<HostEventCount>>> {
    let (resolved, events) = load_week(&state, &source, &query).await?;
    let rows = host_event_counts(&events, &resolved.filters);
    Ok(respond(resolved, rows))
}

/// GET /api/v1/reports/top-items
pub async fn items(
    State(state): State<AppState>,
    source: ReportClient,
    query: ReportQuery,
) -> AppResult<ReportResponse<Vec<ItemEventCount>>> {
    let (resolved, events) = load_week(&state, &source, &query).await?;
    let rows = top_items(&events, &resolved.filters);
    Ok(respond(resolved, rows))
}

/// GET /api/v1/reports/filters
///
/// Severities and tags present in the week, for populating selectors.
/// Ignores any filters in the query.
pub async fn filters(
    State(state): State<AppState>,
    source: ReportClient,
    query: ReportQuery,
) -> AppResult<ReportResponse<FilterOptions>> {
    let (resolved, events) = load_week(&state, &source, &query).await?;
    let rows = filter_options(&events);
    Ok(respond(resolved, rows))
}

/// GET /api/v1/reports/trend
///
/// One point per week, oldest first. The trend ends at the week before the
/// selected one unless `include_current` (or the server default) says
/// otherwise. The echoed range spans the whole trend.
pub async fn trend(
    State(state): State<AppState>,
    source: ReportClient,
    query: ReportQuery,
) -> AppResult<ReportResponse<Vec<WeekTrend>>> {
    let offset = state.config.utc_offset;
    let resolved = query.resolve(state.clock.now(), offset)?;

    let window = TrendWindow {
        include_current: query
            .include_current
            .unwrap_or(state.config.trend.include_current),
        ..state.config.trend
    };
    let weeks = window.weeks_ending(resolved.week);
    let span = match (weeks.first(), weeks.last()) {
        (Some(first), Some(last)) => {
            WeekRange::new(first.range(offset).start_time, last.range(offset).end_time)?
        }
        _ => resolved.range,
    };

    let cached = CachedSource::new(&source.cache, &source.client);
    let rows = week_trend(&cached, resolved.week, window, offset, &resolved.filters).await?;

    Ok(respond(
        ResolvedQuery {
            range: span,
            ..resolved
        },
        rows,
    ))
}
