//! The typed schema snapshot and its JSON round-trip.

use chrono::{DateTime, Utc};
use pgforge_types::{ColumnDescriptor, EntityDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(rename = "tableName")]
    pub table_name: String,
    pub columns: Vec<ColumnSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
    #[serde(rename = "primaryKey")]
    pub primary_key: bool,
    #[serde(rename = "autoIncrement")]
    pub auto_increment: bool,
    pub unique: bool,
    #[serde(rename = "defaultValue")]
    pub default_value: Option<String>,
}

impl ColumnSnapshot {
    /// A column's identity is its name, compared case-insensitively.
    pub fn same_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }

    /// Column equality used by the differ: type, nullable, unique and
    /// default_value. PK/auto-increment are excluded — they cannot be
    /// altered in place.
    pub fn schema_eq(&self, other: &ColumnSnapshot) -> bool {
        self.type_name == other.type_name
            && self.nullable == other.nullable
            && self.unique == other.unique
            && self.default_value == other.default_value
    }
}

impl From<&ColumnDescriptor> for ColumnSnapshot {
    fn from(col: &ColumnDescriptor) -> Self {
        ColumnSnapshot {
            name: col.name.clone(),
            type_name: col.sql_type.ddl_name(col.length),
            nullable: col.nullable,
            primary_key: col.is_primary_key,
            auto_increment: col.is_auto_increment,
            unique: col.is_unique,
            default_value: col.default_value.as_ref().map(|d| d.to_sql_literal()),
        }
    }
}

impl From<&EntityDescriptor> for TableSnapshot {
    fn from(descriptor: &EntityDescriptor) -> Self {
        TableSnapshot {
            table_name: descriptor.table_name.clone(),
            columns: descriptor.columns.iter().map(ColumnSnapshot::from).collect(),
        }
    }
}

impl TableSnapshot {
    pub fn same_name(&self, other: &str) -> bool {
        self.table_name.eq_ignore_ascii_case(other)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSnapshot> {
        self.columns.iter().find(|c| c.same_name(name))
    }
}

/// Builds a snapshot from the given entity descriptors, in declaration order.
/// `version` is set by the caller (the migration engine assigns it from the
/// history table; callers comparing two ad-hoc snapshots may pass 0).
pub fn snapshot_from_entities(entities: &[&EntityDescriptor], version: i64, created_at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        version,
        created_at,
        tables: entities.iter().map(|e| TableSnapshot::from(*e)).collect(),
    }
}
