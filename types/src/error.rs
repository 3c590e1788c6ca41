//! The error taxonomy shared by every pgforge crate.

use thiserror::Error;

/// Unified error type for metadata, query, migration and conversion failures.
#[derive(Debug, Error)]
pub enum PgForgeError {
    /// An entity descriptor is malformed: no primary key, or an unsupported
    /// field shape was asked for as a mapped column.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// The database driver reported an error executing a statement
    /// (syntax, constraint violation, connectivity).
    #[error("query execution error: {0}")]
    QueryExecution(String),

    /// Attempted to roll back to a version that does not exist, or that is
    /// not strictly below the current version.
    #[error("migration conflict: {0}")]
    MigrationConflict(String),

    /// A snapshot could not be serialized to or deserialized from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A driver-native value could not be converted to or from the
    /// application type a column is declared with.
    #[error("type conversion error: {0}")]
    Conversion(String),
}

/// Result type used throughout pgforge.
pub type Result<T> = core::result::Result<T, PgForgeError>;
