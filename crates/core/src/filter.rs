//! Severity and tag filters applied after fetching.
//!
//! Both filters use the same rule for an empty selection: it means "no
//! filter". A client that wants to hide everything simply does not ask.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::event::Event;
use crate::severity::Severity;

/// The user's current severity and tag selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    pub severities: BTreeSet<Severity>,
    pub tags: BTreeSet<String>,
}

impl FilterSet {
    /// A filter set that keeps every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from the raw label and tag lists a client submits.
    ///
    /// Blank entries are ignored; unknown severity labels are rejected.
    pub fn parse<S, T>(severities: S, tags: T) -> Result<Self, CoreError>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let severities = severities
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| Severity::from_str_value(&s).map_err(CoreError::Validation))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self { severities, tags })
    }

    pub fn with_severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severities = severities.into_iter().collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.severities.is_empty() && self.tags.is_empty()
    }

    pub fn matches_severity(&self, event: &Event) -> bool {
        self.severities.is_empty() || self.severities.contains(&event.severity())
    }

    pub fn matches_tags(&self, event: &Event) -> bool {
        self.tags.is_empty() || event.has_any_tag(&self.tags)
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.matches_severity(event) && self.matches_tags(event)
    }

    /// Events passing both filters, in their original order.
    pub fn apply<'a>(&'a self, events: &'a [Event]) -> impl Iterator<Item = &'a Event> + 'a {
        events.iter().filter(move |e| self.matches(e))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn event(id: &str, severity: i64, tags: &[&str]) -> Event {
        Event::new(id, Utc.timestamp_opt(0, 0).unwrap(), "name")
            .with_severity_code(Some(severity))
            .with_tags(tags.iter().copied())
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let events = vec![event("1", 1, &[]), event("2", 5, &["a:b"])];
        assert_eq!(FilterSet::all().apply(&events).count(), 2);
    }

    #[test]
    fn empty_severity_selection_means_all() {
        let filters = FilterSet::all().with_tags(["a:b"]);
        let events = vec![event("1", 1, &["a:b"]), event("2", 5, &["a:b"])];
        assert_eq!(filters.apply(&events).count(), 2);
    }

    #[test]
    fn severity_filter_keeps_only_selected() {
        let filters = FilterSet::all().with_severities([Severity::High]);
        let events = vec![event("1", 4, &[]), event("2", 2, &[]), event("3", 4, &[])];
        let ids: Vec<&str> = filters.apply(&events).map(Event::id).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn tag_filter_requires_any_match() {
        let filters = FilterSet::all().with_tags(["env:prod", "team:db"]);
        let events = vec![
            event("1", 3, &["env:prod"]),
            event("2", 3, &["env:dev"]),
            event("3", 3, &["team:db", "env:dev"]),
            event("4", 3, &[]),
        ];
        let ids: Vec<&str> = filters.apply(&events).map(Event::id).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn unknown_severity_can_be_selected() {
        let filters = FilterSet::all().with_severities([Severity::Unknown]);
        let untagged = Event::new("9", Utc.timestamp_opt(0, 0).unwrap(), "x");
        assert!(filters.matches(&untagged));
    }

    #[test]
    fn parse_skips_blanks_and_trims() {
        let filters = FilterSet::parse(["High", " ", "disaster"], [" env:prod ", ""]).unwrap();
        assert_eq!(
            filters.severities,
            [Severity::High, Severity::Disaster].into_iter().collect()
        );
        assert_eq!(filters.tags, ["env:prod".to_string()].into_iter().collect());
    }

    #[test]
    fn parse_rejects_unknown_label() {
        let err = FilterSet::parse(["Critical"], Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
