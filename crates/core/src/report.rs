//! Multi-week trend assembly.
//!
//! The per-week views only need one fetch, so handlers call the pipelines in
//! [`crate::aggregate`] directly. The trend needs one fetch per week and
//! lives here.

use chrono::FixedOffset;

use crate::aggregate::{summarize_week, WeekTrend};
use crate::error::CoreError;
use crate::filter::FilterSet;
use crate::source::EventSource;
use crate::week::IsoWeek;

/// Default number of weeks in the trend.
pub const DEFAULT_TREND_WEEKS: usize = 10;

/// Which weeks the trend covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendWindow {
    pub weeks: usize,
    /// Include the (still running) current week as the last point.
    pub include_current: bool,
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self {
            weeks: DEFAULT_TREND_WEEKS,
            include_current: false,
        }
    }
}

impl TrendWindow {
    /// The consecutive weeks to report, oldest first.
    pub fn weeks_ending(&self, current: IsoWeek) -> Vec<IsoWeek> {
        let last = if self.include_current {
            current
        } else {
            current.previous()
        };
        last.trailing(self.weeks)
    }
}

/// Fetch and summarize each week of `window`, oldest first.
///
/// Weeks are fetched one after another. The first failure aborts the whole
/// trend; partial trends are never returned.
pub async fn week_trend<S: EventSource>(
    source: &S,
    current: IsoWeek,
    window: TrendWindow,
    offset: FixedOffset,
    filters: &FilterSet,
) -> Result<Vec<WeekTrend>, CoreError> {
    let mut trend = Vec::with_capacity(window.weeks);
    for week in window.weeks_ending(current) {
        let events = source.fetch_events(week.range(offset)).await?;
        trend.push(summarize_week(week, &events, filters));
    }
    trend.sort_by_key(|point| point.week_label);
    Ok(trend)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{Offset, TimeZone, Utc};

    use super::*;
    use crate::event::Event;
    use crate::severity::Severity;
    use crate::source::EventBatch;
    use crate::week::WeekRange;

    /// Returns one event per week, plus an extra High event in even weeks.
    #[derive(Default)]
    struct WeeklySource {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl EventSource for WeeklySource {
        async fn fetch_events(&self, range: WeekRange) -> Result<EventBatch, CoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err(CoreError::Remote("connection reset".into()));
            }
            let at = Utc.timestamp_opt(range.start_time, 0).unwrap();
            let week = IsoWeek::containing(at.date_naive());
            let mut events = vec![Event::new("a", at, "ping")
                .with_host("1", "A")
                .with_severity_code(Some(2))];
            if week.week() % 2 == 0 {
                events.push(
                    Event::new("b", at, "cpu")
                        .with_host("2", "B")
                        .with_severity_code(Some(4)),
                );
            }
            Ok(Arc::new(events))
        }
    }

    #[test]
    fn window_excludes_current_week_by_default() {
        let current = IsoWeek::new(2024, 20).unwrap();
        let weeks = TrendWindow::default().weeks_ending(current);
        assert_eq!(weeks.len(), 10);
        assert_eq!(weeks.last().unwrap().to_string(), "2024-W19");
        assert_eq!(weeks.first().unwrap().to_string(), "2024-W10");
    }

    #[test]
    fn window_can_include_current_week() {
        let current = IsoWeek::new(2024, 20).unwrap();
        let window = TrendWindow {
            weeks: 10,
            include_current: true,
        };
        assert_eq!(window.weeks_ending(current).last(), Some(&current));
    }

    #[tokio::test]
    async fn trend_has_one_ascending_point_per_week() {
        let source = WeeklySource::default();
        let current = IsoWeek::new(2024, 2).unwrap();

        let trend = week_trend(
            &source,
            current,
            TrendWindow::default(),
            Utc.fix(),
            &FilterSet::all(),
        )
        .await
        .unwrap();

        assert_eq!(trend.len(), 10);
        assert_eq!(source.calls.load(Ordering::SeqCst), 10);
        for pair in trend.windows(2) {
            assert_eq!(pair[0].week_label.next(), pair[1].week_label);
        }
        assert_eq!(trend.last().unwrap().week_label.to_string(), "2024-W01");
    }

    #[tokio::test]
    async fn trend_applies_filters_per_week() {
        let source = WeeklySource::default();
        let current = IsoWeek::new(2024, 11).unwrap();
        let high = FilterSet::all().with_severities([Severity::High]);

        let trend = week_trend(&source, current, TrendWindow::default(), Utc.fix(), &high)
            .await
            .unwrap();

        for point in &trend {
            let expected = usize::from(point.week_label.week() % 2 == 0);
            assert_eq!(point.total_events, expected, "{}", point.week_label);
            assert_eq!(point.distinct_hosts, expected);
        }
    }

    #[tokio::test]
    async fn trend_fails_when_any_week_fails() {
        let source = WeeklySource {
            fail_on_call: Some(3),
            ..Default::default()
        };
        let current = IsoWeek::new(2024, 20).unwrap();

        let result = week_trend(
            &source,
            current,
            TrendWindow::default(),
            Utc.fix(),
            &FilterSet::all(),
        )
        .await;

        assert!(matches!(result, Err(CoreError::Remote(_))));
    }
}
