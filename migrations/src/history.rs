//! The `__MigrationHistory` table: the durable record of applied migrations.

use chrono::{DateTime, Utc};
use pgforge_types::{PgForgeError, Result, RowData, SqlExecutor, SqlValue};

pub const HISTORY_TABLE: &str = "__MigrationHistory";

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRecord {
    pub id: i64,
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
    pub snapshot_json: String,
    pub sql_up: String,
    pub sql_down: String,
}

fn text(row: &RowData, column: &str) -> Result<String> {
    match row.get(column) {
        Some(SqlValue::Text(s)) => Ok(s.clone()),
        other => Err(PgForgeError::QueryExecution(format!("expected text column {column}, found {other:?}"))),
    }
}

fn integer(row: &RowData, column: &str) -> Result<i64> {
    match row.get(column) {
        Some(SqlValue::I64(v)) => Ok(*v),
        Some(SqlValue::I32(v)) => Ok(*v as i64),
        other => Err(PgForgeError::QueryExecution(format!("expected integer column {column}, found {other:?}"))),
    }
}

fn record_from_row(row: &RowData) -> Result<MigrationRecord> {
    let applied_at = match row.get("AppliedAt") {
        Some(SqlValue::TimestampTz(t)) => *t,
        Some(SqlValue::Timestamp(t)) => DateTime::<Utc>::from_naive_utc_and_offset(*t, Utc),
        other => return Err(PgForgeError::QueryExecution(format!("expected timestamp AppliedAt, found {other:?}"))),
    };
    Ok(MigrationRecord {
        id: integer(row, "Id")?,
        version: integer(row, "Version")?,
        name: text(row, "Name")?,
        applied_at,
        snapshot_json: text(row, "SnapshotJson")?,
        sql_up: text(row, "SqlUp")?,
        sql_down: text(row, "SqlDown")?,
    })
}

/// Idempotently creates the history table. Safe to call before every
/// migration operation.
pub fn ensure_history_table(executor: &mut dyn SqlExecutor) -> Result<()> {
    executor.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"{HISTORY_TABLE}\" (\n\
             \"Id\" SERIAL PRIMARY KEY,\n\
             \"Version\" BIGINT NOT NULL UNIQUE,\n\
             \"Name\" VARCHAR(255) NOT NULL,\n\
             \"AppliedAt\" TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n\
             \"SnapshotJson\" TEXT NOT NULL,\n\
             \"SqlUp\" TEXT NOT NULL,\n\
             \"SqlDown\" TEXT NOT NULL\n\
             );"
        ),
        &[],
    )?;
    Ok(())
}

/// The highest applied version, or 0 if no migration has ever run.
pub fn current_version(executor: &mut dyn SqlExecutor) -> Result<i64> {
    let scalar = executor.query_scalar(
        &format!("SELECT COALESCE(MAX(\"Version\"), 0) FROM \"{HISTORY_TABLE}\";"),
        &[],
    )?;
    match scalar {
        Some(SqlValue::I64(v)) => Ok(v),
        Some(SqlValue::I32(v)) => Ok(v as i64),
        _ => Ok(0),
    }
}

pub fn load_record(executor: &mut dyn SqlExecutor, version: i64) -> Result<Option<MigrationRecord>> {
    let rows = executor.query(
        &format!(
            "SELECT \"Id\",\"Version\",\"Name\",\"AppliedAt\",\"SnapshotJson\",\"SqlUp\",\"SqlDown\" \
             FROM \"{HISTORY_TABLE}\" WHERE \"Version\" = @p0;"
        ),
        &[SqlValue::I64(version)],
    )?;
    rows.first().map(record_from_row).transpose()
}

/// Inserts a new history row and returns the `Id` Postgres assigned it.
/// `record.id` is ignored — the surrogate key is always database-assigned.
pub fn insert_record(executor: &mut dyn SqlExecutor, record: &MigrationRecord) -> Result<i64> {
    let rows = executor.query(
        &format!(
            "INSERT INTO \"{HISTORY_TABLE}\" (\"Version\",\"Name\",\"AppliedAt\",\"SnapshotJson\",\"SqlUp\",\"SqlDown\") \
             VALUES (@p0,@p1,@p2,@p3,@p4,@p5) RETURNING \"Id\";"
        ),
        &[
            SqlValue::I64(record.version),
            SqlValue::Text(record.name.clone()),
            SqlValue::TimestampTz(record.applied_at),
            SqlValue::Text(record.snapshot_json.clone()),
            SqlValue::Text(record.sql_up.clone()),
            SqlValue::Text(record.sql_down.clone()),
        ],
    )?;
    match rows.first().and_then(|row| row.get("Id")) {
        Some(SqlValue::I64(id)) => Ok(*id),
        Some(SqlValue::I32(id)) => Ok(*id as i64),
        _ => Err(PgForgeError::QueryExecution("INSERT ... RETURNING \"Id\" produced no row".to_string())),
    }
}

pub fn delete_record(executor: &mut dyn SqlExecutor, version: i64) -> Result<()> {
    executor.execute(
        &format!("DELETE FROM \"{HISTORY_TABLE}\" WHERE \"Version\" = @p0;"),
        &[SqlValue::I64(version)],
    )?;
    Ok(())
}

/// All applied migrations, oldest first.
pub fn list_records(executor: &mut dyn SqlExecutor) -> Result<Vec<MigrationRecord>> {
    let rows = executor.query(
        &format!(
            "SELECT \"Id\",\"Version\",\"Name\",\"AppliedAt\",\"SnapshotJson\",\"SqlUp\",\"SqlDown\" \
             FROM \"{HISTORY_TABLE}\" ORDER BY \"Version\" ASC;"
        ),
        &[],
    )?;
    rows.iter().map(record_from_row).collect()
}
