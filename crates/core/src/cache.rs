//! Read-through cache with a time-to-live and per-key fetch de-duplication.
//!
//! Each key owns an async slot. A caller takes the slot's lock, returns the
//! stored value if it is still fresh, and otherwise runs the fetch while
//! still holding the lock. Concurrent callers for the same key queue on that
//! lock and find the fresh value when they get it, so a key is fetched at
//! most once per TTL window. Failed fetches store nothing.
//!
//! The map lock (`std::sync::Mutex`) is only held for slot lookup, never
//! across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::clock::Clock;
use crate::types::Timestamp;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Keys currently tracked, fresh or not.
    pub entries: usize,
    pub ttl_secs: u64,
}

struct Entry<V> {
    value: V,
    stored_at: Timestamp,
}

type Slot<V> = Arc<AsyncMutex<Option<Entry<V>>>>;

struct CacheState<K, V> {
    slots: HashMap<K, Slot<V>>,
    hits: u64,
    misses: u64,
}

/// TTL cache keyed by `K`, handing out clones of `V`.
///
/// `V` is expected to be cheap to clone (an `Arc`, typically).
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// result. Errors from `fetch` are returned as-is and not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(&key);
        let mut entry = slot.lock().await;

        if let Some(stored) = entry.as_ref() {
            if self.is_fresh(stored.stored_at) {
                self.record(true);
                tracing::debug!(?key, "Cache hit");
                return Ok(stored.value.clone());
            }
        }

        self.record(false);
        tracing::debug!(?key, "Cache miss");

        let value = fetch().await?;
        *entry = Some(Entry {
            value: value.clone(),
            stored_at: self.clock.now(),
        });
        Ok(value)
    }

    /// Drop the entry for `key`, if any.
    pub fn invalidate(&self, key: &K) {
        self.lock_state().slots.remove(key);
    }

    pub fn clear(&self) {
        self.lock_state().slots.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.slots.len(),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    // ---- private helpers ----

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Find or create the slot for `key`. Creating a slot also sweeps
    /// stale slots that nobody else is holding.
    fn slot(&self, key: &K) -> Slot<V> {
        let mut state = self.lock_state();
        if let Some(slot) = state.slots.get(key) {
            return Arc::clone(slot);
        }

        state.slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry
                    .as_ref()
                    .is_some_and(|stored| self.is_fresh(stored.stored_at)),
                Err(_) => true,
            }
        });

        let slot: Slot<V> = Arc::new(AsyncMutex::new(None));
        state.slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }

    fn is_fresh(&self, stored_at: Timestamp) -> bool {
        let age = self.clock.now() - stored_at;
        match age.to_std() {
            Ok(age) => age < self.ttl,
            // Stored "in the future" (clock moved back): treat as fresh.
            Err(_) => true,
        }
    }

    fn record(&self, hit: bool) {
        let mut state = self.lock_state();
        if hit {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
    }
}
