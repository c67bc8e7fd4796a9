/// Utility functions for timestamps and loosely-structured sample documents
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Convert a time::Duration to seconds as u64
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    duration.whole_seconds().max(0) as u64
}

/// Read a JSON leaf as a number
///
/// Numbers are taken as-is and numeric strings are parsed; everything else
/// (null, bool, objects, garbage text) is treated as absent.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Resolve a dotted path such as `gases.co_ppm` inside a document
pub fn value_at<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(document, |node, segment| node.get(segment))
}

/// Resolve a dotted path to a numeric leaf
pub fn number_at(document: &Value, path: &str) -> Option<f64> {
    value_at(document, path).and_then(as_number)
}

/// Parse a sample timestamp
///
/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` (assumed UTC).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt);
    }
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(raw, &format)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Total ordering key for timestamps
///
/// Parsable timestamps order by instant; unparsable ones come first, by raw text.
pub fn timestamp_sort_key(raw: &str) -> (Option<i128>, String) {
    (
        parse_timestamp(raw).map(|dt| dt.unix_timestamp_nanos()),
        raw.to_string(),
    )
}
