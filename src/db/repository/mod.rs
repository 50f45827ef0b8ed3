//! Repository layer: table-scoped database operations.
//!
//! All public functions are re-exported here so callers can use `crate::db::*`.

mod appointment;
mod checkpoint;
mod patient;
mod schedule;

use chrono::NaiveDateTime;

use crate::models::DB_TIME_FORMAT;

pub use appointment::*;
pub use checkpoint::*;
pub use patient::*;
pub use schedule::*;

/// Parse a stored `YYYY-MM-DD HH:MM` column, surfacing bad rows as conversion errors.
pub(crate) fn parse_db_time(column: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DB_TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
