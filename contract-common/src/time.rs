//! Timestamp utilities
//!
//! Timestamps are persisted as fixed-width RFC 3339 UTC text
//! (`YYYY-MM-DDTHH:MM:SS.ffffffZ`), so lexical order on the stored column
//! matches chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Millisecond settings from configuration as a `Duration`
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Calendar day of a timestamp, in UTC
pub fn calendar_day(ts: &DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// True when both timestamps fall on the same UTC calendar day
pub fn same_calendar_day(a: &DateTime<Utc>, b: &DateTime<Utc>) -> bool {
    calendar_day(a) == calendar_day(b)
}

/// True for the zero timestamp `0001-01-01T00:00:00Z` that some clients
/// send in place of an absent date
pub fn is_zero(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == ZERO_TIMESTAMP_SECS && ts.timestamp_subsec_nanos() == 0
}

// Seconds from the Unix epoch to 0001-01-01T00:00:00Z
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

/// Format a timestamp for storage
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_storage(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("invalid stored timestamp {:?}: {}", value, e)))
}
