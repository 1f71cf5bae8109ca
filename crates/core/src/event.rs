//! The normalized problem event.
//!
//! Raw platform payloads are converted into [`Event`] exactly once, at the
//! fetch boundary. Fields are private: an event is assembled with the
//! `with_*` builders and is read-only afterwards. Every pipeline downstream
//! reads events by shared reference.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::severity::Severity;
use crate::types::Timestamp;

/// One problem occurrence reported by the monitoring platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: String,
    timestamp: Timestamp,
    event_name: String,
    /// First host in the platform's host list for this event.
    host_id: Option<String>,
    host_name: Option<String>,
    /// Identifier of the object (trigger) that raised the event.
    object_id: Option<String>,
    /// Monitored item from the related-object payload.
    item_id: Option<String>,
    severity_code: Option<i64>,
    #[serde(rename = "severity_label")]
    severity: Severity,
    /// Normalized `tag:value` strings, in platform order.
    tags: Vec<String>,
}

impl Event {
    /// An event with only the mandatory fields set.
    pub fn new(id: impl Into<String>, timestamp: Timestamp, event_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            event_name: event_name.into(),
            host_id: None,
            host_name: None,
            object_id: None,
            item_id: None,
            severity_code: None,
            severity: Severity::Unknown,
            tags: Vec::new(),
        }
    }

    pub fn with_host(self, host_id: impl Into<String>, host_name: impl Into<String>) -> Self {
        self.with_host_id(host_id).with_host_name(host_name)
    }

    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = Some(host_id.into());
        self
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn with_object(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Set the raw code and the label derived from it together, so the two
    /// never disagree.
    pub fn with_severity_code(mut self, code: Option<i64>) -> Self {
        self.severity_code = code;
        self.severity = Severity::from_code(code);
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

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }

    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn severity_code(&self) -> Option<i64> {
        self.severity_code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether at least one of this event's tags is in `wanted`.
    pub fn has_any_tag(&self, wanted: &BTreeSet<String>) -> bool {
        self.tags.iter().any(|t| wanted.contains(t))
    }
}

/// Render a `{tag, value}` pair in the `tag:value` form used for filtering.
pub fn format_tag(tag: &str, value: &str) -> String {
    format!("{tag}:{value}")
}
