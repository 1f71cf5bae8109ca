//! Typed view of the `event.get` payload and its normalization.
//!
//! Top-level fields (`eventid`, `clock`, `name`) are required: a record
//! without them fails the whole response. Nested structures are lenient.
//! Zabbix sends `relatedObject: []` when there is no related object, and
//! older versions omit `tags`, so anything of the wrong shape deserializes
//! to `None` instead of failing. Only the first entry of `hosts` is read,
//! and its fields are lenient too, so a damaged first host yields missing
//! host fields rather than promoting the next host. Identifiers and numbers arrive as strings
//! or as JSON numbers depending on the server version; both are accepted.

use chrono::{TimeZone, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use zreport_core::event::{format_tag, Event};

use crate::error::ZabbixError;

/// One record of an `event.get` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(deserialize_with = "id_string")]
    pub eventid: String,
    #[serde(deserialize_with = "epoch_secs")]
    pub clock: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub objectid: Option<String>,
    #[serde(default, rename = "hosts", deserialize_with = "first_entry")]
    pub host: Option<RawHost>,
    #[serde(default, rename = "relatedObject", deserialize_with = "lenient")]
    pub related_object: Option<RawRelatedObject>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tags: Option<Vec<RawTag>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHost {
    #[serde(default, deserialize_with = "lenient_id")]
    pub hostid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// The object that raised the event. Only the fields reports use are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelatedObject {
    #[serde(default, deserialize_with = "lenient_id")]
    pub itemid: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTag {
    pub tag: String,
    #[serde(default)]
    pub value: String,
}

impl RawEvent {
    /// Convert into the immutable domain event.
    pub fn into_event(self) -> Result<Event, ZabbixError> {
        let timestamp = Utc.timestamp_opt(self.clock, 0).single().ok_or_else(|| {
            ZabbixError::Malformed(format!(
                "event {} has out-of-range clock {}",
                self.eventid, self.clock
            ))
        })?;

        let mut event = Event::new(self.eventid, timestamp, self.name);

        if let Some(host) = self.host {
            if let Some(host_id) = host.hostid {
                event = event.with_host_id(host_id);
            }
            if let Some(host_name) = host.name {
                event = event.with_host_name(host_name);
            }
        }
        if let Some(object_id) = self.objectid {
            event = event.with_object(object_id);
        }
        if let Some(related) = self.related_object {
            if let Some(item_id) = related.itemid {
                event = event.with_item(item_id);
            }
            event = event.with_severity_code(related.priority);
        }
        let tags = self
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| format_tag(&t.tag, &t.value));

        Ok(event.with_tags(tags))
    }
}

// ---------------------------------------------------------------------------
// Deserialization helpers
// ---------------------------------------------------------------------------

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    value_to_id(&value)
        .ok_or_else(|| de::Error::custom(format!("expected a string or number id, got {value}")))
}

fn epoch_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    value_to_int(&value)
        .ok_or_else(|| de::Error::custom(format!("expected epoch seconds, got {value}")))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_id(&Value::deserialize(deserializer)?))
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(value_to_int(&Value::deserialize(deserializer)?))
}

/// `Some(T)` if the value has the shape of `T`, otherwise `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// The first element of an array if it has the shape of `T`. Later elements
/// are never consulted.
fn first_entry<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .next()
            .and_then(|item| serde_json::from_value(item).ok())),
        _ => Ok(None),
    }
}

/// `Some` of the well-formed entries if the value is an array, otherwise
/// `None`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}
