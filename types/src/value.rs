//! Driver-agnostic value representation.
//!
//! `SqlValue` is the "minimal" currency that crosses the `SqlExecutor`
//! boundary: `TypeMap` converts application values to and from it, and a
//! concrete driver adapter converts it to and from whatever the underlying
//! client library wants. Nothing above this boundary names a driver crate.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single bound parameter or returned column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Char(char),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&SqlValue> for SqlValue {
    fn from(value: &SqlValue) -> Self {
        value.clone()
    }
}

/// One materialized row, addressable by column name.
///
/// Mirrors the "look up the reader ordinal by column name" rule in the
/// Metadata/EntitySet materialization contract: a column absent from the
/// row is simply not found, never an error.
#[derive(Debug, Clone, Default)]
pub struct RowData {
    columns: Vec<(String, SqlValue)>,
}

impl RowData {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Case-insensitive lookup by column name, matching the case-insensitive
    /// column identity rule used elsewhere (snapshot column comparison).
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(col, _)| col.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}
