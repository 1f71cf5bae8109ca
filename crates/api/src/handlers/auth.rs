//! Handlers for the `/auth` resource (login, logout, verify).

use axum::extract::State;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zreport_core::error::CoreError;
use zreport_zabbix::auth::verify_cookie;
use zreport_zabbix::{authenticate, AuthMode, Credentials};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::SessionToken;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Session lifetime in seconds.
    pub expires_in: i64,
    pub username: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Log in with Zabbix credentials. Only members of the reporting group get
/// a session. Available when `AUTH_MODE=zabbix`.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    if state.config.auth_mode != AuthMode::Interactive {
        return Err(AppError::BadRequest(
            "Interactive login is disabled (AUTH_MODE is not 'zabbix')".into(),
        ));
    }
    input.validate()?;

    let authed = authenticate(
        &state.zabbix,
        Credentials::Password {
            username: &input.username,
            password: &input.password,
        },
        &state.config.report_group,
    )
    .await?;

    let username = authed.username.unwrap_or(input.username);
    let access_token = state.sessions.issue(&username, authed.client).await;

    Ok(Json(DataResponse {
        data: LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in: state.sessions.ttl_secs(),
            username,
        },
    }))
}

/// POST /api/v1/auth/logout
///
/// End the caller's session, including its Zabbix session.
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<StatusCode> {
    let session = state.sessions.revoke(&token).await.ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired session".into()))
    })?;

    if let Err(e) = session.client.logout().await {
        tracing::warn!(username = %session.username, error = %e, "Zabbix logout failed");
    }
    tracing::info!(username = %session.username, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/verify
///
/// Auth subrequest target for a fronting proxy: 200 when the Zabbix
/// frontend session in the `Cookie` header belongs to a member of the
/// reporting group, 401 otherwise.
pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let Some(cookie) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) else {
        return StatusCode::UNAUTHORIZED;
    };

    match verify_cookie(&state.zabbix, cookie, &state.config.report_group).await {
        Ok(true) => StatusCode::OK,
        Ok(false) => StatusCode::UNAUTHORIZED,
        Err(e) => {
            tracing::debug!(error = %e, "Cookie verification failed");
            StatusCode::UNAUTHORIZED
        }
    }
}
