//! Parameterized DDL/DML generation from an [`EntityDescriptor`].
//!
//! Every statement binds values positionally as `@p0, @p1, …`; `@pId` is
//! reserved for the primary key in an UPDATE's `WHERE` clause. Drivers that
//! want native `$1, $2, …` placeholders adapt at the [`SqlExecutor`]
//! boundary, not here — this module only ever produces text and an ordered
//! parameter list.

use pgforge_types::{column_definition, ColumnDescriptor, EntityDescriptor, SqlValue};

fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

fn mapped_columns(descriptor: &EntityDescriptor) -> &[ColumnDescriptor] {
    &descriptor.columns
}

/// Builds SQL statements for one entity type. Holds no state of its own —
/// every method takes the values it needs and returns `(sql, params)`.
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn create_table(descriptor: &EntityDescriptor) -> String {
        let columns: Vec<String> = mapped_columns(descriptor).iter().map(column_definition).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            quoted(&descriptor.table_name),
            columns.join(",\n    ")
        )
    }

    pub fn drop_table(descriptor: &EntityDescriptor) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE;", quoted(&descriptor.table_name))
    }

    /// `INSERT INTO ... VALUES (@p0, …)`. The auto-increment primary key (if
    /// any) is omitted from the column/value lists and the statement ends
    /// with `RETURNING "pk"` instead of a bare `;`.
    pub fn insert(descriptor: &EntityDescriptor, row: &[SqlValue]) -> (String, Vec<SqlValue>) {
        let pk = descriptor.primary_key();
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (column, value) in mapped_columns(descriptor).iter().zip(row) {
            if column.is_auto_increment && std::ptr::eq(column, pk) {
                continue;
            }
            columns.push(quoted(&column.name));
            params.push(value.clone());
        }
        let placeholders: Vec<String> = (0..params.len()).map(|i| format!("@p{i}")).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(&descriptor.table_name),
            columns.join(", "),
            placeholders.join(", ")
        );
        if pk.is_auto_increment {
            sql.push_str(&format!(" RETURNING {}", quoted(&pk.name)));
        }
        sql.push(';');
        (sql, params)
    }

    pub fn select_all(descriptor: &EntityDescriptor) -> String {
        let columns: Vec<String> = mapped_columns(descriptor).iter().map(|c| quoted(&c.name)).collect();
        format!("SELECT {} FROM {};", columns.join(", "), quoted(&descriptor.table_name))
    }

    pub fn select_by_id(descriptor: &EntityDescriptor, id: SqlValue) -> (String, Vec<SqlValue>) {
        let columns: Vec<String> = mapped_columns(descriptor).iter().map(|c| quoted(&c.name)).collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = @p0;",
            columns.join(", "),
            quoted(&descriptor.table_name),
            quoted(&descriptor.primary_key().name)
        );
        (sql, vec![id])
    }

    /// `where_fragment` is caller-supplied raw SQL (its own `@pN` params are
    /// the caller's to bind); `order_by` is `("column", ascending)`.
    pub fn select_where(descriptor: &EntityDescriptor, where_fragment: Option<&str>, order_by: Option<(&str, bool)>) -> String {
        let columns: Vec<String> = mapped_columns(descriptor).iter().map(|c| quoted(&c.name)).collect();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), quoted(&descriptor.table_name));
        if let Some(fragment) = where_fragment {
            sql.push_str(" WHERE ");
            sql.push_str(fragment);
        }
        if let Some((column, ascending)) = order_by {
            sql.push_str(&format!(" ORDER BY {} {}", quoted(column), if ascending { "ASC" } else { "DESC" }));
        }
        sql.push(';');
        sql
    }

    /// `UPDATE ... SET "c"=@pN, … WHERE "pk" = @pId;` — the primary key is
    /// excluded from `SET` and bound last, as `@pId`.
    pub fn update(descriptor: &EntityDescriptor, row: &[SqlValue]) -> (String, Vec<SqlValue>) {
        let pk = descriptor.primary_key();
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        let mut pk_value = None;
        for (column, value) in mapped_columns(descriptor).iter().zip(row) {
            if std::ptr::eq(column, pk) {
                pk_value = Some(value.clone());
                continue;
            }
            assignments.push(format!("{} = @p{}", quoted(&column.name), params.len()));
            params.push(value.clone());
        }
        let pk_value = pk_value.expect("primary key column is always present in `row`");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = @pId;",
            quoted(&descriptor.table_name),
            assignments.join(", "),
            quoted(&pk.name)
        );
        params.push(pk_value);
        (sql, params)
    }

    /// `SELECT COUNT(*) FROM "T" [WHERE <fragment>];`
    pub fn count(descriptor: &EntityDescriptor, where_fragment: Option<&str>) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quoted(&descriptor.table_name));
        if let Some(fragment) = where_fragment {
            sql.push_str(" WHERE ");
            sql.push_str(fragment);
        }
        sql.push(';');
        sql
    }

    pub fn delete_by_id(descriptor: &EntityDescriptor, id: SqlValue) -> (String, Vec<SqlValue>) {
        let sql = format!(
            "DELETE FROM {} WHERE {} = @p0;",
            quoted(&descriptor.table_name),
            quoted(&descriptor.primary_key().name)
        );
        (sql, vec![id])
    }
}
