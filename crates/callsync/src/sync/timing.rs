//! Time helpers for the sync cycle
//!
//! Pure functions that can be tested without a clock or a provider.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt::Display;

/// Wire format for call times expected by the upstream API
pub const CALL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lower bound (exclusive) for the next call-log query.
///
/// A device that has never synced only looks back `first_run_lookback`
/// instead of uploading its whole history.
pub fn query_floor(watermark_millis: i64, now: DateTime<Utc>, first_run_lookback: Duration) -> i64 {
    if watermark_millis > 0 {
        watermark_millis
    } else {
        (now - first_run_lookback).timestamp_millis()
    }
}

/// Format a call start time in the given zone
pub fn format_call_time<Tz>(timestamp_millis: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc = DateTime::from_timestamp_millis(timestamp_millis).unwrap_or(DateTime::UNIX_EPOCH);
    utc.with_timezone(tz).format(CALL_TIME_FORMAT).to_string()
}
