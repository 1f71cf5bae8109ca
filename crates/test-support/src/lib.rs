//! Test helpers shared by the workspace's integration tests.
//!
//! [`FakeZabbix`] is an in-process stand-in for a Zabbix frontend's
//! JSON-RPC endpoint. It implements the handful of methods the service
//! calls and counts calls per method.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

/// The API token the fake accepts for static-token access.
pub const API_TOKEN: &str = "static-api-token";

/// Body of the HTTP error returned while `event.get` is failing.
pub const EVENTS_DOWN_BODY: &str = "upstream database unavailable";

struct FakeUser {
    username: String,
    password: String,
    groups: Vec<String>,
    /// Hosts whose events the user may read. `None` means all.
    visible_hosts: Option<Vec<String>>,
}

#[derive(Default)]
struct FakeState {
    calls: Mutex<HashMap<String, usize>>,
    last_params: Mutex<HashMap<String, Value>>,
    events: Mutex<Vec<Value>>,
    users: Mutex<Vec<FakeUser>>,
    sessions: Mutex<HashMap<String, String>>,
    next_session: Mutex<usize>,
    fail_events: AtomicBool,
}

/// A running fake server. The serving task lives until the test runtime
/// shuts down.
pub struct FakeZabbix {
    pub url: String,
    state: Arc<FakeState>,
}

impl FakeZabbix {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/api_jsonrpc.php", post(handle_rpc))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn add_user(&self, username: &str, password: &str, groups: &[&str]) {
        self.state.users.lock().unwrap().push(FakeUser {
            username: username.into(),
            password: password.into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            visible_hosts: None,
        });
    }

    /// Limit which hosts' events `username` can read, as Zabbix host-group
    /// permissions do.
    pub fn restrict_hosts(&self, username: &str, hosts: &[&str]) {
        let mut users = self.state.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.username == username)
            .expect("unknown fake user");
        user.visible_hosts = Some(hosts.iter().map(|h| h.to_string()).collect());
    }

    /// Open a frontend session directly, as a browser login would.
    pub fn open_session(&self, username: &str) -> String {
        let sid = format!("browser-{username}");
        self.state
            .sessions
            .lock()
            .unwrap()
            .insert(sid.clone(), username.into());
        sid
    }

    /// Forget every remote session, as a frontend restart or admin kick
    /// would.
    pub fn drop_sessions(&self) {
        self.state.sessions.lock().unwrap().clear();
    }

    pub fn session_count(&self) -> usize {
        self.state.sessions.lock().unwrap().len()
    }

    pub fn push_event(&self, event: Value) {
        self.state.events.lock().unwrap().push(event);
    }

    pub fn fail_events(&self, fail: bool) {
        self.state.fail_events.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state
            .calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.state.last_params.lock().unwrap().get(method).cloned()
    }
}

/// A well-formed `event.get` record.
pub fn raw_event(
    id: u64,
    clock: i64,
    name: &str,
    host: &str,
    priority: u8,
    tags: &[(&str, &str)],
) -> Value {
    json!({
        "eventid": id.to_string(),
        "clock": clock.to_string(),
        "name": name,
        "objectid": (13_000 + id).to_string(),
        "hosts": [{"hostid": format!("h-{host}"), "name": host}],
        "relatedObject": {"itemid": format!("i-{name}"), "priority": priority.to_string()},
        "tags": tags.iter().map(|(t, v)| json!({"tag": t, "value": v})).collect::<Vec<_>>(),
    })
}

// ---------------------------------------------------------------------------
// JSON-RPC dispatch
// ---------------------------------------------------------------------------

fn rpc_result(id: &Value, result: Value) -> Response {
    Json(json!({"jsonrpc": "2.0", "result": result, "id": id})).into_response()
}

fn rpc_error(id: &Value, code: i64, message: &str, data: &str) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": message, "data": data},
        "id": id,
    }))
    .into_response()
}

fn not_authorized(id: &Value) -> Response {
    rpc_error(id, -32602, "Invalid params.", "Not authorized.")
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_session(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get("cookie")?.to_str().ok()?;
    cookie
        .split(';')
        .find_map(|pair| pair.trim().strip_prefix("zbx_session="))
        .map(str::to_string)
}

fn event_clock(event: &Value) -> i64 {
    event["clock"]
        .as_str()
        .and_then(|c| c.parse::<i64>().ok())
        .or_else(|| event["clock"].as_i64())
        .unwrap_or_default()
}

async fn handle_rpc(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let id = body["id"].clone();
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();

    *state.calls.lock().unwrap().entry(method.clone()).or_default() += 1;
    state
        .last_params
        .lock()
        .unwrap()
        .insert(method.clone(), params.clone());

    let session_user = |sid: &str| state.sessions.lock().unwrap().get(sid).cloned();
    let token = bearer(&headers);
    let token_valid = token.as_deref() == Some(API_TOKEN);
    let bearer_user = token.as_deref().and_then(session_user);

    match method.as_str() {
        "apiinfo.version" => {
            if token.is_some() {
                return rpc_error(&id, -32602, "Invalid params.", "Authorization header not allowed.");
            }
            rpc_result(&id, json!("7.0.0"))
        }
        "user.login" => {
            let username = params["username"].as_str().unwrap_or_default();
            let password = params["password"].as_str().unwrap_or_default();
            let known = state
                .users
                .lock()
                .unwrap()
                .iter()
                .any(|u| u.username == username && u.password == password);
            if !known {
                return rpc_error(
                    &id,
                    -32500,
                    "Application error.",
                    "Incorrect user name or password or account is temporarily blocked.",
                );
            }
            let mut next = state.next_session.lock().unwrap();
            let sid = format!("session-{username}-{next}");
            *next += 1;
            state
                .sessions
                .lock()
                .unwrap()
                .insert(sid.clone(), username.to_string());
            rpc_result(&id, json!(sid))
        }
        "user.logout" => match token {
            Some(sid) if state.sessions.lock().unwrap().remove(&sid).is_some() => {
                rpc_result(&id, json!(true))
            }
            _ => not_authorized(&id),
        },
        "user.get" => {
            let caller =
                bearer_user.or_else(|| cookie_session(&headers).and_then(|sid| session_user(&sid)));
            let Some(caller) = caller else {
                if token_valid {
                    return rpc_result(&id, json!([]));
                }
                return not_authorized(&id);
            };
            let wanted = params["filter"]["username"]
                .as_str()
                .map(str::to_string)
                .unwrap_or(caller);
            let result: Vec<Value> = state
                .users
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.username == wanted)
                .map(|u| {
                    let groups: Vec<Value> = u.groups.iter().map(|g| json!({"name": g})).collect();
                    json!({"userid": "1", "username": u.username, "usrgrps": groups})
                })
                .collect();
            rpc_result(&id, json!(result))
        }
        "event.get" => {
            if state.fail_events.load(Ordering::SeqCst) {
                return (StatusCode::BAD_GATEWAY, EVENTS_DOWN_BODY).into_response();
            }
            let visible_hosts = match (&bearer_user, token_valid) {
                (Some(user), _) => state
                    .users
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|u| &u.username == user)
                    .and_then(|u| u.visible_hosts.clone()),
                (None, true) => None,
                (None, false) => return not_authorized(&id),
            };
            let from = params["time_from"].as_i64().unwrap_or(i64::MIN);
            let till = params["time_till"].as_i64().unwrap_or(i64::MAX);
            let mut events: Vec<Value> = state
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| (from..=till).contains(&event_clock(e)))
                .filter(|e| {
                    visible_hosts.as_ref().map_or(true, |hosts| {
                        e["hosts"][0]["name"]
                            .as_str()
                            .is_some_and(|h| hosts.iter().any(|v| v == h))
                    })
                })
                .cloned()
                .collect();
            events.sort_by_key(|e| std::cmp::Reverse(event_clock(e)));
            rpc_result(&id, json!(events))
        }
        other => rpc_error(&id, -32601, "Method not found.", other),
    }
}
