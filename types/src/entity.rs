//! The `Entity` trait: the per-type vtable the derive macro fills in.
//!
//! Dispatch-by-type is replaced with these methods, selected statically by
//! the caller's `T: Entity` bound rather than a runtime type id.

use crate::descriptor::{ColumnDescriptor, EntityDescriptor};
use crate::error::Result;
use crate::value::{RowData, SqlValue};

pub trait Entity: Sized + Clone + 'static {
    /// The static table/column metadata for this type.
    fn descriptor() -> &'static EntityDescriptor;

    /// Reads one mapped column's current value off `self`.
    fn column_value(&self, column: &ColumnDescriptor) -> SqlValue;

    /// Writes one mapped column's value onto `self`, e.g. to assign back an
    /// auto-increment primary key after INSERT ... RETURNING.
    fn set_column_value(&mut self, column: &ColumnDescriptor, value: SqlValue);

    /// Materializes a fresh instance from a query result row. Columns
    /// missing from `row` leave their field at the type's `Default`; NULL
    /// yields `None` for optional fields.
    fn from_row(row: &RowData) -> Result<Self>;

    fn primary_key_value(&self) -> SqlValue {
        self.column_value(Self::descriptor().primary_key())
    }

    fn set_primary_key_value(&mut self, value: SqlValue) {
        let pk = Self::descriptor().primary_key().clone();
        self.set_column_value(&pk, value);
    }
}
