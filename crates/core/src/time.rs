use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{DwLogError, Result};

/// Millisecond ISO-8601 with a `Z` designator, e.g. `2026-02-01T00:00:00.000Z`.
pub fn format_created_at(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored `created_at` value into UTC.
///
/// Backends hand timestamps back in slightly different text shapes: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS.fff+00` (Postgres casts), or a bare datetime that is
/// already UTC (MySQL `DATETIME`).
pub fn parse_created_at(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(input, fmt) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(ts.and_utc());
        }
    }

    Err(DwLogError::Parse(format!(
        "expected timestamp for created_at, got {input}"
    )))
}
