//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server is
//! needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use zreport_api::error::AppError;
use zreport_core::error::CoreError;
use zreport_zabbix::{AuthError, ZabbixError};

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: validation errors map to 400 VALIDATION_ERROR
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("Invalid ISO week '2024-99'".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Invalid ISO week '2024-99'");
}

// ---------------------------------------------------------------------------
// Test: remote failures map to 502 REMOTE_ERROR with a visible message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zabbix_error_returns_502() {
    let err: AppError = ZabbixError::Http {
        status: 500,
        body: "database is down".into(),
    }
    .into();

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "REMOTE_ERROR");
    assert!(json["error"].as_str().unwrap().contains("database is down"));
}

// ---------------------------------------------------------------------------
// Test: auth gate outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_denied_returns_403() {
    let err = AppError::Auth(AuthError::AccessDenied {
        group: "reports".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn auth_failed_returns_401() {
    let err = AppError::Auth(AuthError::AuthFailed("Incorrect user name".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "AUTH_FAILED");
}

#[tokio::test]
async fn unauthorized_returns_401() {
    let err = AppError::Core(CoreError::Unauthorized("Missing Authorization header".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Test: internal errors are sanitized
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_with_sanitized_message() {
    let err = AppError::InternalError("secret detail".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn core_internal_error_is_sanitized() {
    let err = AppError::Core(CoreError::Internal("lock poisoned".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}
