//! # pgforge
//!
//! A small change-tracking ORM and schema migration engine for PostgreSQL.
//! Entities are declared as plain structs with `#[derive(Entity)]`; a
//! [`Session`] tracks staged mutations on [`EntitySet`]s and flushes them in
//! one transaction, while [`MigrationEngine`] (re-exported from
//! `pgforge-migrations`) diffs the declared schema against a stored
//! snapshot and applies or rolls back the difference.

pub mod change_tracker;
pub mod entity_set;
pub mod include;
pub mod postgres_executor;
pub mod querybuilder;
pub mod session;

pub use pgforge_macros::Entity;
pub use pgforge_migrations::{
    compare, forward_sql, reverse_sql, snapshot_from_entities, Change, ColumnSnapshot,
    MigrationEngine, MigrationRecord, Snapshot, TableSnapshot, HISTORY_TABLE,
};
pub use pgforge_types::{
    column_definition, ColumnDescriptor, DefaultLiteral, Entity, EntityDescriptor, EnumColumn,
    ForeignKeyDescriptor, FromSqlValue, PgForgeError, Result, RowData, SqlEnum, SqlExecutor,
    SqlType, SqlValue, ToSqlValue,
};

pub use change_tracker::{ChangeTracker, EntityState};
pub use entity_set::EntitySet;
pub use include::IncludeLoader;
pub use postgres_executor::PostgresExecutor;
pub use querybuilder::QueryBuilder;
pub use session::Session;

/// Brings every commonly used item into scope with one `use pgforge::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ChangeTracker, Entity, EntityDescriptor, EntitySet, EntityState, IncludeLoader,
        MigrationEngine, PgForgeError, PostgresExecutor, QueryBuilder, Result, Session, SqlExecutor,
        SqlValue,
    };
}
