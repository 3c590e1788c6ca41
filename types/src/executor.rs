//! The minimal SQL executor boundary.
//!
//! Everything above this trait is driver-agnostic: `Session`, `EntitySet`
//! and the `MigrationEngine` only ever talk to a `&mut dyn SqlExecutor`.
//! Driver internals (connection pooling, wire protocol, TLS) are a
//! collaborator outside this crate's scope; `pgforge`'s `PostgresExecutor`
//! is the one concrete adapter provided.

use crate::error::Result;
use crate::value::{RowData, SqlValue};

/// A parameterized, synchronous SQL execution surface.
///
/// Implementors execute `sql` with positional `$1, $2, …` placeholders
/// (the native PostgreSQL syntax); `QueryBuilder` emits `@p0, @p1, …` and
/// callers are expected to adapt between the two conventions at this
/// boundary (see the parameter-naming note in the query builder module).
pub trait SqlExecutor {
    /// Execute a statement that does not return rows; returns the number
    /// of affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Execute a statement that returns rows.
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowData>>;

    /// Execute a statement expected to return at most one row with one
    /// column, e.g. `SELECT COUNT(*)` or `SELECT MAX(version)`.
    fn query_scalar(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlValue>>;
}
