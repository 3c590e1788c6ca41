//! Deriving a human-readable migration name from its change set.

use crate::differ::Change;
use chrono::{DateTime, Utc};

/// Names a migration from its changes. All-`CreateTable` change sets (the
/// very first migration) are named `InitialCreate`; otherwise the name is
/// driven by the first change, following the table/column it touches.
/// `now` is threaded in rather than read internally so naming stays
/// deterministic and testable.
pub fn migration_name(changes: &[Change], now: DateTime<Utc>) -> String {
    if !changes.is_empty() && changes.iter().all(|c| matches!(c, Change::CreateTable(_))) {
        return "InitialCreate".to_string();
    }

    match changes.first() {
        Some(Change::CreateTable(table)) => format!("Create{}", table.table_name),
        Some(Change::DropTable(table)) => format!("Drop{}", table.table_name),
        Some(Change::AddColumn { table, column }) => format!("Add{}To{table}", column.name),
        Some(Change::DropColumn { table, column }) => format!("Remove{}From{table}", column.name),
        Some(Change::AlterColumn { table, old, .. }) => format!("Alter{}In{table}", old.name),
        None => format!("Migration_{}", now.format("%Y%m%d%H%M%S")),
    }
}
