//! TypeMap value conversion: `to_db` / `from_db`.

use crate::error::{PgForgeError, Result};
use crate::value::SqlValue;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Converts an application value to its driver-native representation.
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;
}

/// Converts a driver-native value back into an application value.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Result<Self>;
}

macro_rules! leaf_conversion {
    ($ty:ty, $variant:ident) => {
        impl ToSqlValue for $ty {
            fn to_sql_value(&self) -> SqlValue {
                SqlValue::$variant(self.clone())
            }
        }

        impl FromSqlValue for $ty {
            fn from_sql_value(value: &SqlValue) -> Result<Self> {
                match value {
                    SqlValue::$variant(v) => Ok(v.clone()),
                    other => Err(PgForgeError::Conversion(format!(
                        "expected {}, found {other:?}",
                        stringify!($ty)
                    ))),
                }
            }
        }
    };
}

leaf_conversion!(bool, Bool);
leaf_conversion!(i16, I16);
leaf_conversion!(i32, I32);
leaf_conversion!(i64, I64);
leaf_conversion!(f32, F32);
leaf_conversion!(f64, F64);
leaf_conversion!(Decimal, Decimal);
leaf_conversion!(String, Text);
leaf_conversion!(char, Char);
leaf_conversion!(Vec<u8>, Bytes);
leaf_conversion!(NaiveDateTime, Timestamp);
leaf_conversion!(DateTime<Utc>, TimestampTz);
leaf_conversion!(Uuid, Uuid);

/// optional-none -> SQL NULL sentinel; optional-some -> inner conversion.
impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

/// SQL NULL -> optional-none; otherwise the inner type's conversion.
impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(T::from_sql_value(value)?))
        }
    }
}

/// Marker for application enums stored as an INTEGER ordinal.
pub trait SqlEnum: Sized {
    fn to_ordinal(&self) -> i32;
    fn from_ordinal(ordinal: i32) -> Option<Self>;
}

/// Wraps an enum to route it through `SqlEnum` rather than the leaf
/// conversions above. The derive macro emits `EnumColumn<MyEnum>` calls for
/// enum-typed columns so there's no inherent-impl overlap with `i32`.
pub struct EnumColumn<E>(pub E);

impl<E: SqlEnum> ToSqlValue for EnumColumn<E> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::I32(self.0.to_ordinal())
    }
}

impl<E: SqlEnum> FromSqlValue for EnumColumn<E> {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        let ordinal = i32::from_sql_value(value)?;
        E::from_ordinal(ordinal)
            .map(EnumColumn)
            .ok_or_else(|| PgForgeError::Conversion(format!("invalid enum ordinal {ordinal}")))
    }
}
