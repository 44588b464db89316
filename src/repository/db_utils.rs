// ==========================================
// School Closure - shared row helpers
// ==========================================
// Timestamp and enum-code conversion used by every repository
// ==========================================

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;

/// Timestamp as stored in TEXT columns (RFC 3339, UTC)
pub fn ts_to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a TEXT timestamp
///
/// Accepts RFC 3339 (written by this crate) and SQLite's
/// `datetime('now')` format (column defaults).
pub fn parse_db_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn parse_opt_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_db_timestamp(idx, &s)).transpose()
}

/// Map a stored enum code through `parser`, failing the row on unknown codes
pub fn parse_code<T>(idx: usize, raw: &str, parser: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parser(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown code '{}'", raw).into(),
        )
    })
}
