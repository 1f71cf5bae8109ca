//! Establishing an authorized client handle.

use std::str::FromStr;

use zreport_core::error::CoreError;

use crate::client::ZabbixClient;
use crate::error::ZabbixError;

/// Group a user must belong to when logging in interactively.
pub const DEFAULT_REPORT_GROUP: &str = "reports";

/// How the service authenticates against Zabbix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Users log in with their Zabbix credentials and must be members of
    /// the reporting group.
    Interactive,
    /// A fronting proxy gates access; the service itself uses the shared
    /// token.
    External,
    /// No gate; the shared token is used for everyone.
    #[default]
    Unset,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Interactive => "zabbix",
            AuthMode::External => "external",
            AuthMode::Unset => "none",
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(AuthMode::Unset),
            "zabbix" => Ok(AuthMode::Interactive),
            "external" => Ok(AuthMode::External),
            other => Err(format!(
                "unknown auth mode '{other}' (expected 'zabbix', 'external' or empty)"
            )),
        }
    }
}

/// What the caller presents to [`authenticate`].
pub enum Credentials<'a> {
    StaticToken(&'a str),
    Password { username: &'a str, password: &'a str },
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::StaticToken(_) => f.write_str("StaticToken(<redacted>)"),
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credentials were valid but the user is not in the reporting
    /// group.
    #[error("Access denied: user is not a member of '{group}'")]
    AccessDenied { group: String },

    /// Login could not be completed (bad credentials, network, RPC error).
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
}

impl From<ZabbixError> for AuthError {
    fn from(err: ZabbixError) -> Self {
        AuthError::AuthFailed(err.to_string())
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AccessDenied { .. } => CoreError::Forbidden(err.to_string()),
            AuthError::AuthFailed(msg) => CoreError::Unauthorized(msg),
        }
    }
}

/// A client that passed the auth gate, plus who it belongs to.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    pub client: ZabbixClient,
    /// `None` for static-token clients.
    pub username: Option<String>,
}

/// Turn `credentials` into an authorized client.
///
/// A static token always succeeds locally; its validity is only checked by
/// the first real query. A password login succeeds only for members of
/// `group`. When the group check fails, the session that was just opened
/// is logged out before returning.
pub async fn authenticate(
    base: &ZabbixClient,
    credentials: Credentials<'_>,
    group: &str,
) -> Result<AuthenticatedClient, AuthError> {
    match credentials {
        Credentials::StaticToken(token) => Ok(AuthenticatedClient {
            client: base.with_api_token(token),
            username: None,
        }),
        Credentials::Password { username, password } => {
            let client = base.login(username, password).await.map_err(|e| {
                tracing::warn!(username, error = %e, "Zabbix login failed");
                AuthError::from(e)
            })?;

            let member = match client.user_groups(username).await {
                Ok(user) => user.is_some_and(|u| u.is_member_of(group)),
                Err(e) => {
                    close_session(&client).await;
                    return Err(e.into());
                }
            };

            if !member {
                tracing::warn!(username, group, "User is not in the reporting group");
                close_session(&client).await;
                return Err(AuthError::AccessDenied {
                    group: group.to_string(),
                });
            }

            tracing::info!(username, "User authenticated");
            Ok(AuthenticatedClient {
                client,
                username: Some(username.to_string()),
            })
        }
    }
}

/// Ask Zabbix whether the frontend session in `cookie` belongs to a member
/// of `group`. Used by a reverse proxy's auth subrequest.
pub async fn verify_cookie(
    base: &ZabbixClient,
    cookie: &str,
    group: &str,
) -> Result<bool, ZabbixError> {
    let user = base.cookie_user_groups(cookie).await?;
    Ok(user.is_some_and(|u| u.is_member_of(group)))
}

/// Best-effort `user.logout`.
async fn close_session(client: &ZabbixClient) {
    if let Err(e) = client.logout().await {
        tracing::debug!(error = %e, "Ignoring logout failure");
    }
}
