//! Database access for rgsc-import
//!
//! Row mapping for the tables created by `rgsc_common::db::init`. JSON
//! columns hold ordered maps so the stored text is stable across writes.

pub mod charts;
pub mod personal_bests;
pub mod scores;
pub mod sessions;

use rgsc_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(text: &str, column: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let text: String = row.try_get(column)?;
    from_json(&text, column)
}

pub(crate) fn optional_json_column<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<T>> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|t| from_json(&t, column)).transpose()
}

pub(crate) fn index_column(row: &SqliteRow, column: &str) -> Result<usize> {
    let value: i64 = row.try_get(column)?;
    usize::try_from(value)
        .map_err(|_| Error::Internal(format!("Negative {} in database: {}", column, value)))
}

pub(crate) fn parsed_column<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let text: String = row.try_get(column)?;
    text.parse()
}
