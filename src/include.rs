//! Eager loading of related rows, one query per (root, navigation) pair.
//!
//! The cyclic ownership between a parent and its related rows (each could
//! reference the other) rules out making navigation a field that owns its
//! related values directly — see the sidecar note in the crate's design
//! notes. Instead `IncludeLoader` returns the related rows as a map keyed
//! by the root's primary key; callers merge that sidecar into whatever
//! shape they present to the rest of the application.

use pgforge_types::{Entity, PgForgeError, Result, SqlExecutor, SqlValue};
use std::collections::HashMap;

/// Builds `SqlValue` keys usable in a `HashMap`, since `SqlValue` carries
/// floats and can't derive `Eq`/`Hash` itself.
fn key(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "null".to_string(),
        SqlValue::Bool(b) => format!("b:{b}"),
        SqlValue::I16(v) => format!("i16:{v}"),
        SqlValue::I32(v) => format!("i32:{v}"),
        SqlValue::I64(v) => format!("i64:{v}"),
        SqlValue::F32(v) => format!("f32:{v}"),
        SqlValue::F64(v) => format!("f64:{v}"),
        SqlValue::Decimal(v) => format!("dec:{v}"),
        SqlValue::Text(v) => format!("txt:{v}"),
        SqlValue::Char(v) => format!("chr:{v}"),
        SqlValue::Bytes(v) => format!("byt:{v:?}"),
        SqlValue::Timestamp(v) => format!("ts:{v}"),
        SqlValue::TimestampTz(v) => format!("tstz:{v}"),
        SqlValue::Uuid(v) => format!("uuid:{v}"),
    }
}

fn column_matching<'a>(descriptor: &'a pgforge_types::EntityDescriptor, name: &'a str) -> Option<&'a pgforge_types::ColumnDescriptor> {
    descriptor.column(name)
}

/// Loads related rows for a collection navigation: finds the column in
/// `Related` named `<Owner's table name, singular>Id` (falling back to
/// the exact name the caller supplies) and groups the loaded rows by that
/// column's value.
///
/// Conventionally the FK column is named after the owning entity's table
/// with the trailing plural `s` dropped plus `Id`, e.g. `Patients` ->
/// `PatientId`. Callers that deviate pass the exact column name via
/// `fk_column`.
pub struct IncludeLoader;

impl IncludeLoader {
    /// `<OwnerType>Id` for a table named `"Patients"` is `"PatientId"`; used
    /// as the default when a caller doesn't name an explicit FK column.
    pub fn default_fk_column<Owner: Entity>() -> String {
        let table = &Owner::descriptor().table_name;
        let singular = table.strip_suffix('s').unwrap_or(table);
        format!("{singular}Id")
    }

    /// One `SELECT * FROM "RelatedTable" WHERE "<fk>" IN (...)`-equivalent,
    /// issued as one query per owner per the naive per-root loading policy.
    /// Returns related rows grouped by the owner's primary key.
    pub fn load_collection<Owner: Entity, Related: Entity>(
        executor: &mut dyn SqlExecutor,
        owners: &[Owner],
        fk_column: Option<&str>,
    ) -> Result<HashMap<String, Vec<Related>>> {
        let related_descriptor = Related::descriptor();
        let fk_name = fk_column.map(str::to_string).unwrap_or_else(Self::default_fk_column::<Owner>);
        if column_matching(related_descriptor, &fk_name).is_none() {
            return Ok(HashMap::new());
        }

        let related_columns: Vec<String> = related_descriptor.columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
        let mut grouped = HashMap::new();
        for owner in owners {
            let pk = owner.primary_key_value();
            let sql = format!(
                "SELECT {} FROM \"{}\" WHERE \"{}\" = @p0;",
                related_columns.join(", "),
                related_descriptor.table_name,
                fk_name
            );
            let rows = executor.query(&sql, std::slice::from_ref(&pk))?;
            let related = rows.iter().map(Related::from_row).collect::<Result<Vec<_>>>()?;
            grouped.insert(key(&pk), related);
        }
        Ok(grouped)
    }

    /// Loads a single-entity navigation: `fk_field` names the local FK
    /// field on `Owner` (e.g. `"DoctorId"`); owners whose FK value is NULL
    /// are skipped. Returns the related row per owner's primary key.
    pub fn load_single<Owner: Entity, Related: Entity>(
        executor: &mut dyn SqlExecutor,
        owners: &[Owner],
        fk_field: &str,
    ) -> Result<HashMap<String, Related>> {
        let owner_descriptor = Owner::descriptor();
        let related_descriptor = Related::descriptor();
        let fk_column = owner_descriptor
            .column(fk_field)
            .ok_or_else(|| PgForgeError::Metadata(format!("no column named {fk_field} on {}", owner_descriptor.table_name)))?
            .clone();

        let related_columns: Vec<String> = related_descriptor.columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
        let mut loaded = HashMap::new();
        for owner in owners {
            let fk_value = owner.column_value(&fk_column);
            if fk_value.is_null() {
                continue;
            }
            let sql = format!(
                "SELECT {} FROM \"{}\" WHERE \"{}\" = @p0;",
                related_columns.join(", "),
                related_descriptor.table_name,
                related_descriptor.primary_key().name
            );
            let rows = executor.query(&sql, std::slice::from_ref(&fk_value))?;
            if let Some(row) = rows.first() {
                let related = Related::from_row(row)?;
                loaded.insert(key(&owner.primary_key_value()), related);
            }
        }
        Ok(loaded)
    }
}
