//! Server-side login sessions.
//!
//! A successful interactive login yields an opaque access token (a random
//! UUID v4). The token is handed to the client once; the store only keeps
//! its SHA-256 hash, mapped to the Zabbix client that was authorized for
//! that user and to that session's own event cache. Zabbix filters
//! `event.get` by the caller's permissions, so batches are never shared
//! between sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;
use zreport_core::clock::Clock;
use zreport_core::source::EventCache;
use zreport_core::types::Timestamp;
use zreport_zabbix::ZabbixClient;

/// One logged-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    /// Client bound to the user's Zabbix session.
    pub client: ZabbixClient,
    /// Event batches fetched with `client`.
    pub events: Arc<EventCache>,
    pub created_at: Timestamp,
}

/// Thread-safe session registry; designed to be wrapped in `Arc` and shared
/// across the application.
pub struct SessionStore {
    ttl: chrono::Duration,
    event_cache_ttl: Duration,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: chrono::Duration, event_cache_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            event_cache_ttl,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Session lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Register a session and return the plaintext token for the client.
    /// Expired sessions are swept first.
    pub async fn issue(&self, username: &str, client: ZabbixClient) -> String {
        self.sweep().await;

        let token = Uuid::new_v4().to_string();
        let session = Session {
            username: username.to_string(),
            client,
            events: Arc::new(EventCache::new(
                self.event_cache_ttl,
                Arc::clone(&self.clock),
            )),
            created_at: self.clock.now(),
        };
        self.sessions
            .write()
            .await
            .insert(hash_session_token(&token), session);
        token
    }

    /// Look up a live session. Expired sessions are dropped on sight.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let key = hash_session_token(token);
        {
            let sessions = self.sessions.read().await;
            let session = sessions.get(&key)?;
            if !self.is_expired(session) {
                return Some(session.clone());
            }
        }
        self.sessions.write().await.remove(&key);
        None
    }

    /// Remove a session, returning it if it was live.
    pub async fn revoke(&self, token: &str) -> Option<Session> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&hash_session_token(token))?;
        (!self.is_expired(&session)).then_some(session)
    }

    /// Remove every expired session and return them.
    pub async fn purge_expired(&self) -> Vec<Session> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| self.is_expired(s))
            .map(|(key, _)| key.clone())
            .collect();
        expired
            .iter()
            .filter_map(|key| sessions.remove(key))
            .collect()
    }

    /// Purge expired sessions and log each one out of Zabbix, best-effort.
    /// Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let expired = self.purge_expired().await;
        for session in &expired {
            if let Err(e) = session.client.logout().await {
                tracing::debug!(
                    username = %session.username,
                    error = %e,
                    "Ignoring logout failure for expired session"
                );
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired sessions removed");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.clock.now() - session.created_at >= self.ttl
    }
}

/// Compute the SHA-256 hex digest of a session token.
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
