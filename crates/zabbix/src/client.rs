//! JSON-RPC client for the Zabbix frontend API.
//!
//! Wraps `api_jsonrpc.php` using [`reqwest`]. Every call is a single POST
//! with no retries; failures surface as [`ZabbixError`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, COOKIE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use zreport_core::error::CoreError;
use zreport_core::event::Event;
use zreport_core::source::{EventBatch, EventSource};
use zreport_core::week::WeekRange;

use crate::error::ZabbixError;
use crate::raw::RawEvent;

/// Path of the JSON-RPC endpoint below the frontend base URL.
pub const API_PATH: &str = "api_jsonrpc.php";

/// Default timeout for outbound calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The secret a client authenticates with.
#[derive(Clone, PartialEq, Eq)]
enum Credential {
    /// A pre-shared API token.
    ApiToken(String),
    /// A session id obtained from `user.login`.
    Session(String),
}

impl Credential {
    fn secret(&self) -> &str {
        match self {
            Credential::ApiToken(s) | Credential::Session(s) => s,
        }
    }
}

/// Handle on one Zabbix frontend, optionally authenticated.
///
/// Cloning is cheap; clones share the connection pool and the request id
/// counter.
#[derive(Clone)]
pub struct ZabbixClient {
    http: reqwest::Client,
    endpoint: String,
    credential: Option<Credential>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for ZabbixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.credential {
            None => "none",
            Some(Credential::ApiToken(_)) => "api-token(<redacted>)",
            Some(Credential::Session(_)) => "session(<redacted>)",
        };
        f.debug_struct("ZabbixClient")
            .field("endpoint", &self.endpoint)
            .field("auth", &auth)
            .finish()
    }
}

/// A user as returned by `user.get` with `selectUsrgrps`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserGroups {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub usrgrps: Vec<UserGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserGroup {
    pub name: String,
}

impl UserGroups {
    /// Whether any of the user's groups is named `group`, ignoring case.
    pub fn is_member_of(&self, group: &str) -> bool {
        self.usrgrps
            .iter()
            .any(|g| g.name.eq_ignore_ascii_case(group))
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

impl ZabbixClient {
    /// Create an unauthenticated client.
    ///
    /// * `base_url` - Frontend URL, e.g. `https://zabbix.example.com`.
    ///   `/api_jsonrpc.php` is appended unless already present.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ZabbixError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: Self::endpoint_for(base_url),
            credential: None,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Resolve the JSON-RPC endpoint for a frontend base URL.
    pub fn endpoint_for(base_url: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.ends_with(API_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}/{API_PATH}")
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// A copy of this client that authenticates with a static API token.
    pub fn with_api_token(&self, token: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential::ApiToken(token.into())),
            ..self.clone()
        }
    }

    /// Whether this client holds an interactive session (as opposed to a
    /// static token or nothing).
    pub fn has_session(&self) -> bool {
        matches!(self.credential, Some(Credential::Session(_)))
    }

    /// Log in with a username and password, returning a client bound to
    /// the new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Self, ZabbixError> {
        let session: String = self
            .call(
                "user.login",
                json!({ "username": username, "password": password }),
                None,
            )
            .await?;

        Ok(Self {
            credential: Some(Credential::Session(session)),
            ..self.clone()
        })
    }

    /// Groups of `username`, as seen by this client's credential.
    pub async fn user_groups(&self, username: &str) -> Result<Option<UserGroups>, ZabbixError> {
        let users: Vec<UserGroups> = self
            .call(
                "user.get",
                json!({
                    "output": ["userid", "username"],
                    "filter": { "username": username },
                    "selectUsrgrps": ["name"],
                }),
                None,
            )
            .await?;
        Ok(users.into_iter().next())
    }

    /// Groups of the user owning the frontend session carried in `cookie`.
    ///
    /// The request carries the caller's `Cookie` header and no credential
    /// of its own, so Zabbix resolves the user from the browser session.
    pub async fn cookie_user_groups(&self, cookie: &str) -> Result<Option<UserGroups>, ZabbixError> {
        let users: Vec<UserGroups> = self
            .call(
                "user.get",
                json!({ "output": ["userid"], "selectUsrgrps": ["name"] }),
                Some(cookie),
            )
            .await?;
        Ok(users.into_iter().next())
    }

    /// End the interactive session. A no-op for token clients.
    pub async fn logout(&self) -> Result<(), ZabbixError> {
        if !self.has_session() {
            return Ok(());
        }
        let _: Value = self.call("user.logout", json!([]), None).await?;
        Ok(())
    }

    /// Remote API version. Does not need a credential.
    pub async fn api_version(&self) -> Result<String, ZabbixError> {
        let unauthenticated = Self {
            credential: None,
            ..self.clone()
        };
        unauthenticated.call("apiinfo.version", json!({}), None).await
    }

    /// Fetch problem events with `clock ∈ [range.start_time, range.end_time)`,
    /// newest first.
    pub async fn problem_events(&self, range: WeekRange) -> Result<Vec<Event>, ZabbixError> {
        let raw: Vec<RawEvent> = self
            .call("event.get", Self::problem_event_params(range), None)
            .await?;
        tracing::debug!(
            start = range.start_time,
            end = range.end_time,
            count = raw.len(),
            "Fetched problem events",
        );
        raw.into_iter().map(RawEvent::into_event).collect()
    }

    /// `event.get` parameters for a half-open range. The remote `time_till`
    /// bound is inclusive.
    pub fn problem_event_params(range: WeekRange) -> Value {
        json!({
            "output": "extend",
            "time_from": range.start_time,
            "time_till": range.end_time - 1,
            "value": 1,
            "selectHosts": ["hostid", "name"],
            "selectRelatedObject": "extend",
            "selectTags": "extend",
            "sortfield": ["clock"],
            "sortorder": "DESC",
        })
    }

    // ---- private helpers ----

    /// Perform one JSON-RPC call and decode its `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        cookie: Option<&str>,
    ) -> Result<T, ZabbixError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(credential) = &self.credential {
            request = request.header(AUTHORIZATION, format!("Bearer {}", credential.secret()));
        }
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let started = Instant::now();
        let result = async {
            let response = Self::ensure_success(request.send().await?).await?;
            Self::parse_result(response.json::<RpcResponse<T>>().await?)
        }
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(method, elapsed_ms, "Zabbix call succeeded"),
            Err(e) => tracing::warn!(method, elapsed_ms, error = %e, "Zabbix call failed"),
        }
        result
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`ZabbixError::Http`] with the status and
    /// body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ZabbixError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ZabbixError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn parse_result<T>(response: RpcResponse<T>) -> Result<T, ZabbixError> {
        if let Some(err) = response.error {
            return Err(ZabbixError::Api {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }
        response
            .result
            .ok_or_else(|| ZabbixError::Malformed("response has neither result nor error".into()))
    }
}

impl EventSource for ZabbixClient {
    fn fetch_events(
        &self,
        range: WeekRange,
    ) -> impl Future<Output = Result<EventBatch, CoreError>> + Send {
        async move {
            let events = self.problem_events(range).await?;
            Ok(Arc::new(events))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_api_path() {
        assert_eq!(
            ZabbixClient::endpoint_for("https://zbx.example.com"),
            "https://zbx.example.com/api_jsonrpc.php"
        );
        assert_eq!(
            ZabbixClient::endpoint_for("https://zbx.example.com/zabbix/"),
            "https://zbx.example.com/zabbix/api_jsonrpc.php"
        );
    }

    #[test]
    fn endpoint_keeps_existing_api_path() {
        assert_eq!(
            ZabbixClient::endpoint_for("http://127.0.0.1/api_jsonrpc.php"),
            "http://127.0.0.1/api_jsonrpc.php"
        );
    }

    #[test]
    fn debug_output_redacts_token() {
        let client = ZabbixClient::with_client(reqwest::Client::new(), "http://zbx")
            .with_api_token("s3cr3t-token");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("s3cr3t-token"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn event_params_use_inclusive_upper_bound() {
        let range = WeekRange::new(1_709_510_400, 1_710_115_200).unwrap();
        let params = ZabbixClient::problem_event_params(range);
        assert_eq!(params["time_from"], 1_709_510_400);
        assert_eq!(params["time_till"], 1_710_115_199);
        assert_eq!(params["value"], 1);
        assert_eq!(params["selectRelatedObject"], "extend");
        assert_eq!(params["sortorder"], "DESC");
    }

    #[test]
    fn group_membership_ignores_case() {
        let user: UserGroups = serde_json::from_value(json!({
            "userid": "3",
            "usrgrps": [{"name": "Zabbix administrators"}, {"name": "Reports"}]
        }))
        .unwrap();
        assert!(user.is_member_of("reports"));
        assert!(!user.is_member_of("operators"));
    }

    #[test]
    fn rpc_error_object_becomes_api_error() {
        let response: RpcResponse<Value> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32602, "message": "Invalid params.", "data": "Not authorized."},
            "id": 1
        }))
        .unwrap();
        match ZabbixClient::parse_result(response) {
            Err(ZabbixError::Api { code, data, .. }) => {
                assert_eq!(code, -32602);
                assert_eq!(data, "Not authorized.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
