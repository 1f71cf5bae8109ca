//! The seam between report pipelines and the monitoring platform.

use std::future::Future;
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::error::CoreError;
use crate::event::Event;
use crate::week::WeekRange;

/// A shared, immutable batch of normalized events.
pub type EventBatch = Arc<Vec<Event>>;

/// Event cache keyed strictly by time range.
pub type EventCache = TtlCache<WeekRange, EventBatch>;

/// Default time-to-live for cached event batches.
pub const DEFAULT_EVENT_CACHE_TTL_SECS: u64 = 6000;

/// Anything that can produce the problem events of a time range.
pub trait EventSource: Send + Sync {
    /// Fetch all problem events with `timestamp ∈ [start_time, end_time)`,
    /// newest first.
    fn fetch_events(
        &self,
        range: WeekRange,
    ) -> impl Future<Output = Result<EventBatch, CoreError>> + Send;
}

/// Read-through wrapper that serves repeated ranges from an [`EventCache`].
pub struct CachedSource<'a, S> {
    cache: &'a EventCache,
    inner: &'a S,
}

impl<'a, S: EventSource> CachedSource<'a, S> {
    pub fn new(cache: &'a EventCache, inner: &'a S) -> Self {
        Self { cache, inner }
    }
}

impl<S: EventSource> EventSource for CachedSource<'_, S> {
    fn fetch_events(
        &self,
        range: WeekRange,
    ) -> impl Future<Output = Result<EventBatch, CoreError>> + Send {
        self.cache
            .get_or_try_insert_with(range, move || self.inner.fetch_events(range))
    }
}
