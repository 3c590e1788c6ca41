//! Diffing two snapshots into an ordered list of changes.

use crate::snapshot::{ColumnSnapshot, Snapshot, TableSnapshot};

/// One schema change, carrying enough of the old/new state to render both
/// its forward and reverse SQL without consulting the snapshots again.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    CreateTable(TableSnapshot),
    DropTable(TableSnapshot),
    AddColumn { table: String, column: ColumnSnapshot },
    DropColumn { table: String, column: ColumnSnapshot },
    AlterColumn { table: String, old: ColumnSnapshot, new: ColumnSnapshot },
}

impl Change {
    pub fn table_name(&self) -> &str {
        match self {
            Change::CreateTable(t) | Change::DropTable(t) => &t.table_name,
            Change::AddColumn { table, .. }
            | Change::DropColumn { table, .. }
            | Change::AlterColumn { table, .. } => table,
        }
    }
}

/// Computes the change set taking `old` to `new`.
///
/// `old == None` means there is no prior snapshot at all (first migration):
/// every table in `new` is a `CreateTable`, in declaration order. Otherwise
/// tables and columns are compared in `new`'s declaration order first (so
/// additions/changes surface before removals), and removed tables are
/// appended last — matching the order a reviewer would want to read a
/// migration diff in.
pub fn compare(old: Option<&Snapshot>, new: &Snapshot) -> Vec<Change> {
    let mut changes = Vec::new();

    let Some(old) = old else {
        for table in &new.tables {
            changes.push(Change::CreateTable(table.clone()));
        }
        return changes;
    };

    for new_table in &new.tables {
        match old.tables.iter().find(|t| t.same_name(&new_table.table_name)) {
            None => changes.push(Change::CreateTable(new_table.clone())),
            Some(old_table) => changes.extend(compare_table(old_table, new_table)),
        }
    }

    for old_table in &old.tables {
        if !new.tables.iter().any(|t| t.same_name(&old_table.table_name)) {
            changes.push(Change::DropTable(old_table.clone()));
        }
    }

    changes
}

fn compare_table(old: &TableSnapshot, new: &TableSnapshot) -> Vec<Change> {
    let mut changes = Vec::new();

    for new_col in &new.columns {
        match old.column(&new_col.name) {
            None => changes.push(Change::AddColumn {
                table: new.table_name.clone(),
                column: new_col.clone(),
            }),
            Some(old_col) if !old_col.schema_eq(new_col) => changes.push(Change::AlterColumn {
                table: new.table_name.clone(),
                old: old_col.clone(),
                new: new_col.clone(),
            }),
            Some(_) => {}
        }
    }

    for old_col in &old.columns {
        if new.column(&old_col.name).is_none() {
            changes.push(Change::DropColumn {
                table: old.table_name.clone(),
                column: old_col.clone(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn col(name: &str, type_name: &str, nullable: bool) -> ColumnSnapshot {
        ColumnSnapshot {
            name: name.to_string(),
            type_name: type_name.to_string(),
            nullable,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default_value: None,
        }
    }

    fn snapshot(tables: Vec<TableSnapshot>) -> Snapshot {
        Snapshot { version: 0, created_at: Utc::now(), tables }
    }

    #[test]
    fn no_old_snapshot_creates_every_table() {
        let new = snapshot(vec![TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![col("Id", "INTEGER", false)],
        }]);
        let changes = compare(None, &new);
        assert_eq!(changes, vec![Change::CreateTable(new.tables[0].clone())]);
    }

    #[test]
    fn added_column_is_detected() {
        let old = snapshot(vec![TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![col("Id", "INTEGER", false)],
        }]);
        let new = snapshot(vec![TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![col("Id", "INTEGER", false), col("MiddleName", "VARCHAR(50)", true)],
        }]);
        let changes = compare(Some(&old), &new);
        assert_eq!(
            changes,
            vec![Change::AddColumn {
                table: "Patients".to_string(),
                column: col("MiddleName", "VARCHAR(50)", true),
            }]
        );
    }

    #[test]
    fn dropped_table_surfaces_after_additions() {
        let old = snapshot(vec![
            TableSnapshot { table_name: "Patients".to_string(), columns: vec![col("Id", "INTEGER", false)] },
            TableSnapshot { table_name: "Obsolete".to_string(), columns: vec![col("Id", "INTEGER", false)] },
        ]);
        let new = snapshot(vec![TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![col("Id", "INTEGER", false)],
        }]);
        let changes = compare(Some(&old), &new);
        assert_eq!(changes, vec![Change::DropTable(old.tables[1].clone())]);
    }

    #[test]
    fn column_name_comparison_is_case_insensitive() {
        let old = snapshot(vec![TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![col("oib", "VARCHAR(20)", false)],
        }]);
        let new = snapshot(vec![TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![col("OIB", "VARCHAR(20)", false)],
        }]);
        assert!(compare(Some(&old), &new).is_empty());
    }
}
