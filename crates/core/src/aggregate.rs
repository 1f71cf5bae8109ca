//! Report pipelines over normalized events.
//!
//! Each pipeline filters first, then groups, counts and sorts. Grouping
//! keeps first-occurrence order and sorting is stable, so ties keep that
//! order and results are deterministic for a given input. Top-N views sort
//! before truncating.
//!
//! Events without the grouping key (no host, no item) are left out of that
//! grouping.

use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;

use crate::event::Event;
use crate::filter::FilterSet;
use crate::severity::Severity;
use crate::week::IsoWeek;

/// Rows kept by the top-N views.
pub const TOP_N: usize = 20;

// ---------------------------------------------------------------------------
// Result rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostCount {
    pub host_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostEventCount {
    pub host_name: String,
    pub event_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemEventCount {
    pub item_id: String,
    pub event_name: String,
    pub count: usize,
}

/// One point of the multi-week trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekTrend {
    pub week_label: IsoWeek,
    pub total_events: usize,
    pub unique_event_names: usize,
    pub distinct_hosts: usize,
}

/// Values present in a set of events, for populating filter pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub severities: Vec<Severity>,
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Filtered events in their original (newest first) order.
pub fn raw_listing(events: &[Event], filters: &FilterSet) -> Vec<Event> {
    filters.apply(events).cloned().collect()
}

/// The [`TOP_N`] hosts with the most events.
pub fn top_hosts(events: &[Event], filters: &FilterSet) -> Vec<HostCount> {
    let counts = count_by(filters.apply(events), |e| e.host_name().map(str::to_string));
    top(counts, TOP_N)
        .into_iter()
        .map(|(host_name, count)| HostCount { host_name, count })
        .collect()
}

/// Event counts per `(host, event name)`, highest first. Not truncated.
pub fn host_event_counts(events: &[Event], filters: &FilterSet) -> Vec<HostEventCount> {
    let counts = count_by(filters.apply(events), |e| {
        e.host_name()
            .map(|host| (host.to_string(), e.event_name().to_string()))
    });
    top(counts, usize::MAX)
        .into_iter()
        .map(|((host_name, event_name), count)| HostEventCount {
            host_name,
            event_name,
            count,
        })
        .collect()
}

/// The [`TOP_N`] `(item, event name)` pairs with the most events.
pub fn top_items(events: &[Event], filters: &FilterSet) -> Vec<ItemEventCount> {
    let counts = count_by(filters.apply(events), |e| {
        e.item_id()
            .map(|item| (item.to_string(), e.event_name().to_string()))
    });
    top(counts, TOP_N)
        .into_iter()
        .map(|((item_id, event_name), count)| ItemEventCount {
            item_id,
            event_name,
            count,
        })
        .collect()
}

/// Summarize one week's events for the trend view.
pub fn summarize_week(week: IsoWeek, events: &[Event], filters: &FilterSet) -> WeekTrend {
    let mut total_events = 0;
    let mut names: HashSet<&str> = HashSet::new();
    let mut hosts: HashSet<&str> = HashSet::new();

    for event in filters.apply(events) {
        total_events += 1;
        names.insert(event.event_name());
        if let Some(host) = event.host_name() {
            hosts.insert(host);
        }
    }

    WeekTrend {
        week_label: week,
        total_events,
        unique_event_names: names.len(),
        distinct_hosts: hosts.len(),
    }
}

/// Distinct severities and tags across `events`, sorted. Filters are not
/// applied, so a picker always offers every value present in the week.
pub fn filter_options(events: &[Event]) -> FilterOptions {
    let severities: BTreeSet<Severity> = events.iter().map(Event::severity).collect();
    let tags: BTreeSet<&str> = events
        .iter()
        .flat_map(|e| e.tags().iter().map(String::as_str))
        .collect();

    FilterOptions {
        severities: severities.into_iter().collect(),
        tags: tags.into_iter().map(str::to_string).collect(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Count events per key in first-occurrence order. Events for which `key`
/// yields `None` are skipped.
fn count_by<'a, K, I, F>(events: I, key: F) -> IndexMap<K, usize>
where
    K: Hash + Eq,
    I: Iterator<Item = &'a Event>,
    F: Fn(&Event) -> Option<K>,
{
    let mut counts = IndexMap::new();
    for event in events {
        if let Some(k) = key(event) {
            *counts.entry(k).or_insert(0) += 1;
        }
    }
    counts
}

/// Stable sort by count descending, then keep the first `n`.
fn top<K>(counts: IndexMap<K, usize>, n: usize) -> Vec<(K, usize)> {
    let mut rows: Vec<(K, usize)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows.truncate(n);
    rows
}
