//! The one concrete [`SqlExecutor`]: a thin, synchronous adapter over the
//! `postgres` crate.
//!
//! `QueryBuilder` emits `@p0, @p1, …`; this module only ever receives
//! already-adapted `$1, $2, …` SQL (see [`adapt_placeholders`]) so the
//! `postgres` crate's prepared-statement machinery can bind positionally.
//! Every `postgres::Error` is converted to [`PgForgeError::QueryExecution`]
//! at this boundary — `pgforge-types` never names the `postgres` crate.

use chrono::{DateTime, NaiveDateTime, Utc};
use pgforge_types::{PgForgeError, Result, RowData, SqlExecutor, SqlValue};
use postgres::types::{ToSql, Type as PgType};
use postgres::{Client, NoTls, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Rewrites `@p0, @p1, … @pId` into `$1, $2, …`, in order of first
/// appearance. `QueryBuilder` never reuses a placeholder, so a left-to-right
/// rename is sufficient.
fn adapt_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut next_index = 1;
    let mut chars = sql.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c == '@' && chars.peek().map(|(_, c)| *c) == Some('p') {
            chars.next();
            while matches!(chars.peek(), Some((_, c)) if c.is_ascii_alphanumeric()) {
                chars.next();
            }
            out.push_str(&format!("${next_index}"));
            next_index += 1;
        } else {
            out.push(c);
        }
    }
    out
}

fn to_boxed_sql(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null => Box::new(Option::<String>::None),
        SqlValue::Bool(v) => Box::new(*v),
        SqlValue::I16(v) => Box::new(*v),
        SqlValue::I32(v) => Box::new(*v),
        SqlValue::I64(v) => Box::new(*v),
        SqlValue::F32(v) => Box::new(*v),
        SqlValue::F64(v) => Box::new(*v),
        SqlValue::Decimal(v) => Box::new(*v),
        SqlValue::Text(v) => Box::new(v.clone()),
        SqlValue::Char(v) => Box::new(v.to_string()),
        SqlValue::Bytes(v) => Box::new(v.clone()),
        SqlValue::Timestamp(v) => Box::new(*v),
        SqlValue::TimestampTz(v) => Box::new(*v),
        SqlValue::Uuid(v) => Box::new(*v),
    }
}

fn sql_value_from_row(row: &Row, index: usize) -> Result<SqlValue> {
    let column_type = row.columns()[index].type_();
    let convert = |e: postgres::Error| PgForgeError::QueryExecution(e.to_string());
    let value = match *column_type {
        PgType::BOOL => row.try_get::<_, Option<bool>>(index).map_err(convert)?.map(SqlValue::Bool),
        PgType::INT2 => row.try_get::<_, Option<i16>>(index).map_err(convert)?.map(SqlValue::I16),
        PgType::INT4 => row.try_get::<_, Option<i32>>(index).map_err(convert)?.map(SqlValue::I32),
        PgType::INT8 => row.try_get::<_, Option<i64>>(index).map_err(convert)?.map(SqlValue::I64),
        PgType::FLOAT4 => row.try_get::<_, Option<f32>>(index).map_err(convert)?.map(SqlValue::F32),
        PgType::FLOAT8 => row.try_get::<_, Option<f64>>(index).map_err(convert)?.map(SqlValue::F64),
        PgType::NUMERIC => row.try_get::<_, Option<Decimal>>(index).map_err(convert)?.map(SqlValue::Decimal),
        PgType::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index).map_err(convert)?.map(SqlValue::Bytes),
        PgType::TIMESTAMP => row.try_get::<_, Option<NaiveDateTime>>(index).map_err(convert)?.map(SqlValue::Timestamp),
        PgType::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map_err(convert)?
            .map(SqlValue::TimestampTz),
        PgType::UUID => row.try_get::<_, Option<Uuid>>(index).map_err(convert)?.map(SqlValue::Uuid),
        PgType::BPCHAR => row
            .try_get::<_, Option<String>>(index)
            .map_err(convert)?
            .and_then(|s| s.chars().next())
            .map(SqlValue::Char),
        // TEXT, VARCHAR and anything else unrecognized decode as text.
        _ => row.try_get::<_, Option<String>>(index).map_err(convert)?.map(SqlValue::Text),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

fn row_to_row_data(row: &Row) -> Result<RowData> {
    let mut columns = Vec::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        columns.push((column.name().to_string(), sql_value_from_row(row, index)?));
    }
    Ok(RowData::new(columns))
}

/// Owns a live `postgres::Client`. Constructed once per [`crate::Session`]
/// lifetime; `Session` never reaches past this adapter to the driver.
pub struct PostgresExecutor {
    client: Client,
}

impl PostgresExecutor {
    pub fn connect(config: &str) -> Result<Self> {
        let client = Client::connect(config, NoTls).map_err(|e| PgForgeError::QueryExecution(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl SqlExecutor for PostgresExecutor {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let sql = adapt_placeholders(sql);
        let boxed: Vec<_> = params.iter().map(to_boxed_sql).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref() as &(dyn ToSql + Sync)).collect();
        self.client.execute(&sql, &refs).map_err(|e| PgForgeError::QueryExecution(e.to_string()))
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowData>> {
        let sql = adapt_placeholders(sql);
        let boxed: Vec<_> = params.iter().map(to_boxed_sql).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref() as &(dyn ToSql + Sync)).collect();
        let rows = self.client.query(&sql, &refs).map_err(|e| PgForgeError::QueryExecution(e.to_string()))?;
        rows.iter().map(row_to_row_data).collect()
    }

    fn query_scalar(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlValue>> {
        let rows = self.query(sql, params)?;
        Ok(rows.into_iter().next().and_then(|row| row.column_names().next().map(|c| c.to_string()).and_then(|c| row.get(&c).cloned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_rewrite_is_left_to_right() {
        assert_eq!(adapt_placeholders("SELECT * FROM \"T\" WHERE \"a\" = @p0 AND \"b\" = @p1"), "SELECT * FROM \"T\" WHERE \"a\" = $1 AND \"b\" = $2");
    }

    #[test]
    fn pid_placeholder_adapts_like_any_other() {
        assert_eq!(adapt_placeholders("UPDATE \"T\" SET \"c\" = @p0 WHERE \"id\" = @pId"), "UPDATE \"T\" SET \"c\" = $1 WHERE \"id\" = $2");
    }
}
