//! Timestamp utilities
//!
//! Scores and sessions store times as milliseconds since the Unix epoch.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Current time in milliseconds since the epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a textual timestamp into epoch milliseconds
///
/// Accepts RFC 3339 (`2021-03-24T07:15:22Z`) or `YYYY-MM-DD HH:MM:SS`,
/// the latter read as UTC.
pub fn parse_timestamp(text: &str) -> Result<i64> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return validate_millis(dt.timestamp_millis(), text);
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return validate_millis(naive.and_utc().timestamp_millis(), text);
        }
    }

    Err(Error::UnparsableTimestamp(text.to_string()))
}

/// Reject negative epoch values
pub fn validate_millis(millis: i64, original: &str) -> Result<i64> {
    if millis < 0 {
        return Err(Error::UnparsableTimestamp(original.to_string()));
    }
    Ok(millis)
}
