//! Millisecond-precision ISO-8601 timestamps
//!
//! Cache maps store modification times as strings of the exact form
//! `YYYY-MM-DDTHH:MM:SS.mmmZ`. Timestamps are compared as strings, so the
//! conversion has to be deterministic: sub-millisecond parts are rounded half
//! up, and a value of `.9995` seconds or more carries into the next second
//! rather than producing a four-digit millisecond field.
//!
//! Epoch times are seconds since midnight Jan 1, 1970 as `f64`, with
//! microseconds after the decimal point (`123.456` is 123456 milliseconds).

use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use std::time::SystemTime;

/// The only timestamp layout written to or accepted from a cache map
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Convert an epoch time to an ISO string
pub fn epoch_to_iso(epoch_secs: f64) -> CacheResult<String> {
    epoch_to_datetime(epoch_secs).map(|dt| datetime_to_iso(&dt))
}

/// Round to milliseconds and format with an explicit `Z` suffix
pub fn datetime_to_iso(dt: &DateTime<Utc>) -> String {
    let micros = i64::from(dt.timestamp_subsec_micros().min(999_999));
    let whole = dt.with_nanosecond(0).unwrap_or(*dt);
    let rounded = whole + Duration::milliseconds((micros + 500) / 1000);
    rounded.format(ISO_FORMAT).to_string()
}

/// Convert an epoch time to a datetime with microsecond precision
///
/// Negative values are dates before 1970.
pub fn epoch_to_datetime(epoch_secs: f64) -> CacheResult<DateTime<Utc>> {
    if !epoch_secs.is_finite() {
        return Err(CacheError::invalid_argument(format!(
            "epoch time {epoch_secs} is not a finite number"
        )));
    }
    let micros = (epoch_secs * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return Err(CacheError::invalid_argument(format!(
            "epoch time {epoch_secs} is out of range"
        )));
    }
    DateTime::from_timestamp_micros(micros as i64).ok_or_else(|| {
        CacheError::invalid_argument(format!("epoch time {epoch_secs} is out of range"))
    })
}

/// Convert a datetime to an epoch time
pub fn datetime_to_epoch(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

/// Format a filesystem timestamp
pub fn system_time_to_iso(time: SystemTime) -> String {
    datetime_to_iso(&DateTime::<Utc>::from(time))
}

/// Parse a timestamp previously produced by [`datetime_to_iso`]
pub fn iso_to_datetime(iso: &str) -> CacheResult<DateTime<Utc>> {
    // chrono treats the fraction as optional when parsing
    let bytes = iso.as_bytes();
    if bytes.len() != 24 || bytes[19] != b'.' || bytes[23] != b'Z' {
        return Err(CacheError::MalformedTimestamp(iso.to_string()));
    }
    NaiveDateTime::parse_from_str(iso, ISO_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| CacheError::MalformedTimestamp(iso.to_string()))
}
