//! Schema snapshot, diff and migration-history engine for pgforge.
//!
//! This crate only talks to a database through `pgforge_types::SqlExecutor`
//! — it has no driver dependency of its own, so it can be used with
//! `pgforge`'s `PostgresExecutor` or any test double implementing the trait.

pub mod differ;
pub mod engine;
pub mod history;
pub mod naming;
pub mod snapshot;
pub mod sqlgen;

pub use differ::{compare, Change};
pub use engine::MigrationEngine;
pub use history::{MigrationRecord, HISTORY_TABLE};
pub use naming::migration_name;
pub use snapshot::{snapshot_from_entities, ColumnSnapshot, Snapshot, TableSnapshot};
pub use sqlgen::{forward_sql, reverse_sql};
