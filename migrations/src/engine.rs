//! `MigrationEngine`: ties the snapshot differ, SQL codegen and history
//! table together into the operations an application actually calls.

use crate::differ::{compare, Change};
use crate::history::{self, MigrationRecord};
use crate::naming::migration_name;
use crate::snapshot::{snapshot_from_entities, Snapshot};
use crate::sqlgen::{forward_sql, reverse_sql};
use chrono::{DateTime, Utc};
use pgforge_types::{EntityDescriptor, PgForgeError, Result, SqlExecutor};

fn execute_statements(executor: &mut dyn SqlExecutor, sql: &str) -> Result<()> {
    for statement in sql.lines().map(str::trim).filter(|s| !s.is_empty()) {
        executor.execute(statement, &[])?;
    }
    Ok(())
}

fn load_current_snapshot(executor: &mut dyn SqlExecutor, current_version: i64) -> Result<Option<Snapshot>> {
    if current_version == 0 {
        return Ok(None);
    }
    let record = history::load_record(executor, current_version)?.ok_or_else(|| {
        PgForgeError::MigrationConflict(format!("no history row for current version {current_version}"))
    })?;
    Ok(Some(serde_json::from_str(&record.snapshot_json)?))
}

fn plan(executor: &mut dyn SqlExecutor, entities: &[&EntityDescriptor], now: DateTime<Utc>) -> Result<(i64, Snapshot, Vec<Change>)> {
    history::ensure_history_table(executor)?;
    let current_version = history::current_version(executor)?;
    let old_snapshot = load_current_snapshot(executor, current_version)?;
    let new_snapshot = snapshot_from_entities(entities, current_version + 1, now);
    let changes = compare(old_snapshot.as_ref(), &new_snapshot);
    Ok((current_version, new_snapshot, changes))
}

pub struct MigrationEngine;

impl MigrationEngine {
    /// Diffs the current database schema against `entities` and applies the
    /// resulting migration in one pass, recording it in `__MigrationHistory`.
    /// Returns `None` if the schemas already match.
    ///
    /// Each change's statements execute in order; the first error aborts
    /// the run without rolling back already-applied statements — callers
    /// wrapping this in a transaction get that guarantee from the driver.
    pub fn migrate_all(
        executor: &mut dyn SqlExecutor,
        entities: &[&EntityDescriptor],
        now: DateTime<Utc>,
    ) -> Result<Option<MigrationRecord>> {
        let span = tracing::info_span!("migrate_all");
        let _enter = span.enter();

        let (current_version, new_snapshot, changes) = plan(executor, entities, now)?;
        if changes.is_empty() {
            tracing::debug!("schema already up to date at version {current_version}");
            return Ok(None);
        }

        let sql_up: Vec<String> = changes.iter().map(forward_sql).collect();
        let sql_down: Vec<String> = changes.iter().map(reverse_sql).collect();

        for up in &sql_up {
            execute_statements(executor, up)?;
        }

        let mut record = MigrationRecord {
            id: 0,
            version: current_version + 1,
            name: migration_name(&changes, now),
            applied_at: now,
            snapshot_json: serde_json::to_string(&new_snapshot)?,
            sql_up: sql_up.join("\n"),
            sql_down: sql_down.join("\n"),
        };
        record.id = history::insert_record(executor, &record)?;
        tracing::info!(version = record.version, name = %record.name, "applied migration");
        Ok(Some(record))
    }

    /// Rolls back the single most recently applied migration.
    pub fn rollback(executor: &mut dyn SqlExecutor) -> Result<()> {
        let current = history::current_version(executor)?;
        if current == 0 {
            return Ok(());
        }
        Self::rollback_to(executor, current - 1)
    }

    /// Rolls back every migration above `target`, in reverse order. `target`
    /// must be a version strictly below the current one (it need not be a
    /// version that ever existed, as long as it's `>= 0`).
    pub fn rollback_to(executor: &mut dyn SqlExecutor, target: i64) -> Result<()> {
        let span = tracing::info_span!("rollback_to", target);
        let _enter = span.enter();

        let current = history::current_version(executor)?;
        if target < 0 || target >= current {
            return Err(PgForgeError::MigrationConflict(format!(
                "cannot roll back to version {target}: current version is {current}"
            )));
        }

        let mut version = current;
        while version > target {
            let record = history::load_record(executor, version)?.ok_or_else(|| {
                PgForgeError::MigrationConflict(format!("no history row for version {version}"))
            })?;
            execute_statements(executor, &record.sql_down)?;
            history::delete_record(executor, version)?;
            tracing::info!(version, "rolled back migration");
            version -= 1;
        }
        Ok(())
    }

    /// Drops every mapped table (in reverse declaration order, so foreign
    /// keys tear down cleanly) and the history table, then re-runs
    /// `migrate_all` from a clean slate.
    pub fn reset(executor: &mut dyn SqlExecutor, entities: &[&EntityDescriptor], now: DateTime<Utc>) -> Result<()> {
        for entity in entities.iter().rev() {
            executor.execute(&format!("DROP TABLE IF EXISTS \"{}\" CASCADE;", entity.table_name), &[])?;
        }
        executor.execute(&format!("DROP TABLE IF EXISTS \"{}\" CASCADE;", history::HISTORY_TABLE), &[])?;
        Self::migrate_all(executor, entities, now)?;
        Ok(())
    }

    /// Every applied migration, oldest first.
    pub fn show_history(executor: &mut dyn SqlExecutor) -> Result<Vec<MigrationRecord>> {
        history::ensure_history_table(executor)?;
        history::list_records(executor)
    }

    /// The changes `migrate_all` would apply right now, without applying them.
    pub fn show_migration_plan(executor: &mut dyn SqlExecutor, entities: &[&EntityDescriptor], now: DateTime<Utc>) -> Result<Vec<Change>> {
        let (_, _, changes) = plan(executor, entities, now)?;
        Ok(changes)
    }
}
