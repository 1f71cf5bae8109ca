//! Trigger severity codes and their display labels.
//!
//! The monitoring platform reports severity as an integer `0..=5`. Reports
//! treat it as a display string, so anything outside the table (including
//! a missing code) becomes the [`Severity::Unknown`] sentinel rather than
//! an error.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const LABEL_NOT_CLASSIFIED: &str = "Not classified";
pub const LABEL_INFORMATION: &str = "Information";
pub const LABEL_WARNING: &str = "Warning";
pub const LABEL_AVERAGE: &str = "Average";
pub const LABEL_HIGH: &str = "High";
pub const LABEL_DISASTER: &str = "Disaster";

/// Label used when the code is absent or out of range.
pub const LABEL_UNKNOWN: &str = "None";

/// All valid severity labels, lowest first.
pub const VALID_LABELS: &[&str] = &[
    LABEL_NOT_CLASSIFIED,
    LABEL_INFORMATION,
    LABEL_WARNING,
    LABEL_AVERAGE,
    LABEL_HIGH,
    LABEL_DISASTER,
    LABEL_UNKNOWN,
];

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a problem event.
///
/// Ordering follows the numeric code, with `Unknown` sorting last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "Not classified")]
    NotClassified,
    Information,
    Warning,
    Average,
    High,
    Disaster,
    #[serde(rename = "None")]
    Unknown,
}

impl Severity {
    /// Map a raw severity code through the fixed table.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Self::NotClassified,
            Some(1) => Self::Information,
            Some(2) => Self::Warning,
            Some(3) => Self::Average,
            Some(4) => Self::High,
            Some(5) => Self::Disaster,
            _ => Self::Unknown,
        }
    }

    /// Parse a display label, ignoring case and surrounding whitespace.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        let wanted = s.trim();
        [
            Self::NotClassified,
            Self::Information,
            Self::Warning,
            Self::Average,
            Self::High,
            Self::Disaster,
            Self::Unknown,
        ]
        .into_iter()
        .find(|sev| sev.label().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            format!(
                "Invalid severity '{wanted}'. Must be one of: {}",
                VALID_LABELS.join(", ")
            )
        })
    }

    /// Display label shown in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotClassified => LABEL_NOT_CLASSIFIED,
            Self::Information => LABEL_INFORMATION,
            Self::Warning => LABEL_WARNING,
            Self::Average => LABEL_AVERAGE,
            Self::High => LABEL_HIGH,
            Self::Disaster => LABEL_DISASTER,
            Self::Unknown => LABEL_UNKNOWN,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
