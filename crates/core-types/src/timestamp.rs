//! Normalization of the timestamps clients send.
//!
//! Sensors report either epoch seconds (10 digits) or epoch milliseconds
//! (13 digits); the map front end sends date strings. Everything ends up as a
//! `DateTime<Utc>`.

use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Values at or above this magnitude are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Converts an epoch value in seconds or milliseconds to a UTC timestamp.
pub fn from_epoch(value: i64) -> Result<DateTime<Utc>, CoreError> {
    let converted = if value.abs() >= MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    };
    converted.ok_or(CoreError::TimestampOutOfRange(value))
}

/// Parses a timestamp string.
///
/// Accepted forms, in order: RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD` (midnight) and a bare epoch number.
/// Strings without an offset are read as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, CoreError> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    if let Ok(epoch) = input.parse::<i64>() {
        return from_epoch(epoch);
    }

    Err(CoreError::InvalidInput(
        "timestamp".to_string(),
        format!("unrecognised timestamp '{input}'"),
    ))
}
