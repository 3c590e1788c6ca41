//! Shared metadata, value-conversion and executor types for pgforge.
//!
//! This crate is the dependency floor of the workspace: it is pulled in by
//! both `pgforge-migrations` (for `EntityDescriptor`/`SqlExecutor`) and the
//! root `pgforge` crate, without either of those depending on the other.

pub mod conversions;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod value;

pub use conversions::{EnumColumn, FromSqlValue, SqlEnum, ToSqlValue};
pub use descriptor::{column_definition, ColumnDescriptor, DefaultLiteral, EntityDescriptor, ForeignKeyDescriptor, SqlType};
pub use entity::Entity;
pub use error::{PgForgeError, Result};
pub use executor::SqlExecutor;
pub use value::{RowData, SqlValue};
