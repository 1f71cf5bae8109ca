//! Session-based extractors for Axum handlers.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use zreport_core::error::CoreError;
use zreport_core::source::EventCache;
use zreport_zabbix::{AuthMode, ZabbixClient};

use crate::error::AppError;
use crate::state::AppState;

/// The Zabbix client a report request runs with, and the cache its
/// batches live in.
///
/// With `AUTH_MODE=zabbix` both belong to the caller's login session and a
/// valid `Authorization: Bearer <token>` is required. In the other modes the
/// shared token client and the shared cache are used for every request.
///
/// ```ignore
/// async fn my_handler(source: ReportClient) -> AppResult<Json<()>> {
///     let events = CachedSource::new(&source.cache, &source.client)
///         .fetch_events(range)
///         .await?;
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ReportClient {
    pub client: ZabbixClient,
    pub cache: Arc<EventCache>,
}

impl FromRequestParts<AppState> for ReportClient {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.config.auth_mode != AuthMode::Interactive {
            let client = state.shared_client.clone().ok_or_else(|| {
                AppError::InternalError("No shared Zabbix token is configured".into())
            })?;
            return Ok(ReportClient {
                client,
                cache: Arc::clone(&state.event_cache),
            });
        }

        let session = SessionToken::from_request_parts(parts, state).await?;
        let session = state.sessions.get(&session.0).await.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired session".into()))
        })?;

        Ok(ReportClient {
            client: session.client,
            cache: session.events,
        })
    }
}

/// The raw bearer token of the request.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        Ok(SessionToken(token.trim().to_string()))
    }
}
