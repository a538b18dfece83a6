// =============================================================================
// Bucket timestamp normalisation
// =============================================================================
//
// The producer owns the `ts_min` column and its encoding. Text timestamps are
// the common case; numeric epochs are accepted so an integer-keyed table still
// renders. Everything is normalised to a naive UTC `NaiveDateTime`.
// =============================================================================

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::CellValue;

/// Epoch values below this magnitude are seconds.
const SECONDS_CEILING: i64 = 100_000_000_000;
/// Epoch values below this magnitude (and above seconds) are milliseconds.
const MILLIS_CEILING: i64 = 100_000_000_000_000;

const TEXT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a stored `ts_min` value. Returns `None` when the value cannot be
/// interpreted as a point in time.
pub fn parse_bucket_ts(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Text(s) => parse_text(s.trim()),
        CellValue::Integer(v) => from_epoch_int(*v),
        CellValue::Real(v) => from_epoch_secs_f64(*v),
        CellValue::Timestamp(ts) => Some(*ts),
        CellValue::Null | CellValue::Blob(_) => None,
    }
}

fn parse_text(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in TEXT_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn from_epoch_int(v: i64) -> Option<NaiveDateTime> {
    let magnitude = v.unsigned_abs();
    let dt = if magnitude < SECONDS_CEILING as u64 {
        DateTime::from_timestamp(v, 0)
    } else if magnitude < MILLIS_CEILING as u64 {
        DateTime::from_timestamp_millis(v)
    } else {
        let secs = v.div_euclid(1_000_000_000);
        let nanos = v.rem_euclid(1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    };
    dt.map(|d| d.naive_utc())
}

fn from_epoch_secs_f64(v: f64) -> Option<NaiveDateTime> {
    if !v.is_finite() {
        return None;
    }
    let millis = (v * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|d| d.naive_utc())
}
