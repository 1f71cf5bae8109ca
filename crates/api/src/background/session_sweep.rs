//! Periodic removal of expired login sessions.
//!
//! Sessions are also swept whenever a new one is issued; this loop covers
//! idle periods with no logins, so expired Zabbix sessions are still
//! logged out.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::session::SessionStore;

/// How often the sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Run the session sweep loop every `every` until `cancel` is triggered.
/// The first sweep runs immediately.
pub async fn run(sessions: Arc<SessionStore>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Session sweep job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweep job stopping");
                break;
            }
            _ = interval.tick() => {
                if sessions.sweep().await == 0 {
                    tracing::debug!("Session sweep: nothing expired");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use zreport_core::clock::ManualClock;
    use zreport_zabbix::ZabbixClient;

    use super::*;

    #[tokio::test]
    async fn sweeps_expired_sessions_until_cancelled() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_000_000, 0).unwrap()));
        let sessions = Arc::new(SessionStore::new(
            chrono::Duration::minutes(10),
            Duration::from_secs(600),
            clock.clone(),
        ));
        let client = ZabbixClient::new("http://zbx", Duration::from_secs(1)).unwrap();
        sessions.issue("alice", client).await;
        clock.advance(chrono::Duration::minutes(11));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&sessions),
            Duration::from_millis(20),
            cancel.clone(),
        ));

        for _ in 0..100 {
            if sessions.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(sessions.is_empty().await);

        cancel.cancel();
        task.await.unwrap();
    }
}
