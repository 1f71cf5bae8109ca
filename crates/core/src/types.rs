/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Seconds since the Unix epoch, as the monitoring platform expresses time.
pub type EpochSecs = i64;
