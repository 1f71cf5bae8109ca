//! Shared helpers for the HTTP-level integration tests.
//!
//! [`TestApp`] wires the real router against a [`FakeZabbix`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use zreport_api::config::ServerConfig;
use zreport_api::router::build_app_router;
use zreport_api::state::AppState;
use zreport_core::clock::ManualClock;
use zreport_core::types::Timestamp;

pub use zreport_test_support::{raw_event, FakeZabbix, API_TOKEN, EVENTS_DOWN_BODY};

/// Wednesday 2024-03-06 12:00 UTC, in 2024-W10.
pub fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap()
}

/// Monday 2024-03-04 00:00 UTC, the start of 2024-W10.
pub const W10_START: i64 = 1_709_510_400;
pub const WEEK_SECS: i64 = 7 * 24 * 3600;

// ---------------------------------------------------------------------------
// App under test
// ---------------------------------------------------------------------------

/// Build a `ServerConfig` pointing at `zabbix_url`, with `extra` overrides.
pub fn test_config(zabbix_url: &str, extra: &[(&str, &str)]) -> ServerConfig {
    let mut env: HashMap<String, String> = HashMap::from([
        ("HOST".into(), "127.0.0.1".into()),
        ("PORT".into(), "0".into()),
        ("ZABBIX_URL".into(), zabbix_url.into()),
        ("ZABBIX_TOKEN".into(), API_TOKEN.into()),
        ("ZABBIX_TIMEOUT_SECS".into(), "5".into()),
    ]);
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    ServerConfig::from_lookup(|key| env.get(key).cloned()).expect("test config should load")
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

/// Build the full application router against `zabbix_url`, with the clock
/// fixed at [`now`].
pub fn build_test_app(zabbix_url: &str, extra: &[(&str, &str)]) -> TestApp {
    let clock = Arc::new(ManualClock::new(now()));
    let state = AppState::new(test_config(zabbix_url, extra), clock.clone()).unwrap();
    let router = build_app_router(state.clone()).unwrap();
    TestApp {
        router,
        clock,
        state,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
