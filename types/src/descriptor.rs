//! Static entity/column metadata and the DDL fragment it produces.
//!
//! These types are the compile-time replacement for runtime reflection:
//! `#[derive(Entity)]` builds one `&'static EntityDescriptor` per
//! annotated struct, lazily, behind a `OnceLock`, instead of walking
//! properties at runtime.

use chrono::NaiveDateTime;

/// Application-type to SQL-type mapping (TypeMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    DoublePrecision,
    /// Renders `VARCHAR(N)` when a `length` is given on the column, else `TEXT`.
    String,
    /// Always renders `CHAR(1)`.
    Char,
    Boolean,
    Timestamp,
    TimestampTz,
    Uuid,
    Bytes,
    /// Enumerations are stored by ordinal.
    EnumOrdinal,
}

impl SqlType {
    /// The DDL type name for this column, given its declared `length`.
    pub fn ddl_name(&self, length: Option<u32>) -> String {
        match self {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Decimal => "DECIMAL".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::DoublePrecision => "DOUBLE PRECISION".to_string(),
            SqlType::String => match length {
                Some(n) => format!("VARCHAR({n})"),
                None => "TEXT".to_string(),
            },
            SqlType::Char => "CHAR(1)".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMPTZ".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Bytes => "BYTEA".to_string(),
            SqlType::EnumOrdinal => "INTEGER".to_string(),
        }
    }

    /// A type-appropriate NOT NULL default, used when AddColumn injects one
    /// for a new non-nullable column.
    pub fn zero_default(&self) -> DefaultLiteral {
        match self {
            SqlType::SmallInt
            | SqlType::Integer
            | SqlType::BigInt
            | SqlType::EnumOrdinal => DefaultLiteral::Numeric("0".to_string()),
            SqlType::Decimal | SqlType::Real | SqlType::DoublePrecision => {
                DefaultLiteral::Numeric("0.0".to_string())
            }
            SqlType::Boolean => DefaultLiteral::Bool(false),
            SqlType::Timestamp | SqlType::TimestampTz => DefaultLiteral::Raw("NOW()".to_string()),
            SqlType::String | SqlType::Char | SqlType::Uuid | SqlType::Bytes => {
                DefaultLiteral::Text(String::new())
            }
        }
    }
}

/// A pre-formatted DEFAULT literal (column_definition's literal formatting rules).
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultLiteral {
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    /// Numeric literal, already formatted in decimal (e.g. `"0"`, `"3.14"`).
    Numeric(String),
    /// An unquoted SQL expression, e.g. `NOW()`.
    Raw(String),
}

impl DefaultLiteral {
    pub fn to_sql_literal(&self) -> String {
        match self {
            DefaultLiteral::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultLiteral::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            DefaultLiteral::Timestamp(t) => format!("'{}'", t.format("%Y-%m-%d %H:%M:%S")),
            DefaultLiteral::Numeric(s) => s.clone(),
            DefaultLiteral::Raw(s) => s.clone(),
        }
    }
}

/// A foreign key reference to another mapped entity's column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDescriptor {
    pub reference_table: String,
    pub reference_column: String,
}

/// Static description of one mapped column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub is_unique: bool,
    pub default_value: Option<DefaultLiteral>,
    pub foreign_key: Option<ForeignKeyDescriptor>,
    pub length: Option<u32>,
}

/// Static description of one mapped entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key_index: usize,
}

impl EntityDescriptor {
    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[self.primary_key_index]
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Produces the DDL fragment for one column.
pub fn column_definition(col: &ColumnDescriptor) -> String {
    if col.is_primary_key && col.is_auto_increment {
        return format!("\"{}\" SERIAL PRIMARY KEY", col.name);
    }

    let mut def = format!("\"{}\" {}", col.name, col.sql_type.ddl_name(col.length));
    if col.is_primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if col.is_unique {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = &col.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(&default.to_sql_literal());
    }
    def
}
