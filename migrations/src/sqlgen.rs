//! Renders a `Change` into forward ("up") and reverse ("down") SQL.

use crate::differ::Change;
use crate::snapshot::{ColumnSnapshot, TableSnapshot};

fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

fn column_ddl(col: &ColumnSnapshot) -> String {
    if col.primary_key && col.auto_increment {
        return format!("{} SERIAL PRIMARY KEY", quoted(&col.name));
    }
    let mut def = format!("{} {}", quoted(&col.name), col.type_name);
    if col.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if col.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = &col.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    def
}

fn create_table_sql(table: &TableSnapshot) -> String {
    let columns: Vec<String> = table.columns.iter().map(column_ddl).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        quoted(&table.table_name),
        columns.join(",\n    ")
    )
}

fn drop_table_sql(table: &TableSnapshot) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE;", quoted(&table.table_name))
}

/// A type-appropriate placeholder for a newly non-nullable column, matching
/// `SqlType::zero_default` one level removed from the typed descriptor
/// (snapshots only carry the rendered DDL type name).
fn type_default(type_name: &str) -> &'static str {
    let upper = type_name.to_ascii_uppercase();
    if upper.starts_with("SMALLINT") || upper.starts_with("INTEGER") || upper.starts_with("BIGINT") {
        "0"
    } else if upper.starts_with("DECIMAL") || upper.starts_with("REAL") || upper.starts_with("DOUBLE") {
        "0.0"
    } else if upper.starts_with("BOOLEAN") {
        "FALSE"
    } else if upper.starts_with("TIMESTAMP") {
        "NOW()"
    } else {
        "''"
    }
}

fn add_column_sql(table: &str, column: &ColumnSnapshot) -> String {
    let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", quoted(table), quoted(&column.name), column.type_name);
    match &column.default_value {
        Some(default) => {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        None if !column.nullable => {
            sql.push_str(" DEFAULT ");
            sql.push_str(type_default(&column.type_name));
        }
        None => {}
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    sql.push(';');
    sql
}

fn drop_column_sql(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {};", quoted(table), quoted(column))
}

fn unique_constraint_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_unique")
}

fn alter_column_sql(table: &str, old: &ColumnSnapshot, new: &ColumnSnapshot) -> String {
    let mut statements = Vec::new();
    let t = quoted(table);
    let c = quoted(&new.name);

    if old.type_name != new.type_name {
        statements.push(format!("ALTER TABLE {t} ALTER COLUMN {c} TYPE {};", new.type_name));
    }
    if old.nullable != new.nullable {
        let clause = if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        statements.push(format!("ALTER TABLE {t} ALTER COLUMN {c} {clause};"));
    }
    if old.unique != new.unique {
        let constraint = quoted(&unique_constraint_name(table, &new.name));
        if new.unique {
            statements.push(format!("ALTER TABLE {t} ADD CONSTRAINT {constraint} UNIQUE ({c});"));
        } else {
            statements.push(format!("ALTER TABLE {t} DROP CONSTRAINT {constraint};"));
        }
    }
    if old.default_value != new.default_value {
        match &new.default_value {
            Some(default) => statements.push(format!("ALTER TABLE {t} ALTER COLUMN {c} SET DEFAULT {default};")),
            None => statements.push(format!("ALTER TABLE {t} ALTER COLUMN {c} DROP DEFAULT;")),
        }
    }

    statements.join("\n")
}

/// The SQL that applies `change` going forward.
pub fn forward_sql(change: &Change) -> String {
    match change {
        Change::CreateTable(table) => create_table_sql(table),
        Change::DropTable(table) => drop_table_sql(table),
        Change::AddColumn { table, column } => add_column_sql(table, column),
        Change::DropColumn { table, column } => drop_column_sql(table, &column.name),
        Change::AlterColumn { table, old, new } => alter_column_sql(table, old, new),
    }
}

/// The SQL that undoes `change`.
pub fn reverse_sql(change: &Change) -> String {
    match change {
        Change::CreateTable(table) => drop_table_sql(table),
        Change::DropTable(table) => create_table_sql(table),
        Change::AddColumn { table, column } => drop_column_sql(table, &column.name),
        Change::DropColumn { table, column } => add_column_sql(table, column),
        Change::AlterColumn { table, old, new } => alter_column_sql(table, new, old),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn create_table_collapses_auto_increment_pk_to_serial() {
        let table = TableSnapshot {
            table_name: "Patients".to_string(),
            columns: vec![
                ColumnSnapshot { primary_key: true, auto_increment: true, ..col("Id", "INTEGER", false) },
                col("FirstName", "VARCHAR(50)", false),
            ],
        };
        let sql = forward_sql(&Change::CreateTable(table));
        assert!(sql.contains("\"Id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"FirstName\" VARCHAR(50) NOT NULL"));
    }

    #[test]
    fn add_non_nullable_column_injects_type_default() {
        let change = Change::AddColumn {
            table: "Patients".to_string(),
            column: col("Status", "INTEGER", false),
        };
        assert_eq!(forward_sql(&change), "ALTER TABLE \"Patients\" ADD COLUMN \"Status\" INTEGER DEFAULT 0;");
    }

    #[test]
    fn add_nullable_column_has_no_default() {
        let change = Change::AddColumn {
            table: "Patients".to_string(),
            column: col("MiddleName", "VARCHAR(50)", true),
        };
        assert_eq!(forward_sql(&change), "ALTER TABLE \"Patients\" ADD COLUMN \"MiddleName\" VARCHAR(50);");
    }

    #[test]
    fn reverse_of_add_column_is_drop_column() {
        let change = Change::AddColumn {
            table: "Patients".to_string(),
            column: col("MiddleName", "VARCHAR(50)", true),
        };
        assert_eq!(reverse_sql(&change), "ALTER TABLE \"Patients\" DROP COLUMN \"MiddleName\";");
    }

    #[test]
    fn alter_column_swaps_old_and_new_on_reverse() {
        let change = Change::AlterColumn {
            table: "Patients".to_string(),
            old: col("Notes", "TEXT", true),
            new: col("Notes", "TEXT", false),
        };
        assert_eq!(forward_sql(&change), "ALTER TABLE \"Patients\" ALTER COLUMN \"Notes\" SET NOT NULL;");
        assert_eq!(reverse_sql(&change), "ALTER TABLE \"Patients\" ALTER COLUMN \"Notes\" DROP NOT NULL;");
    }
}
