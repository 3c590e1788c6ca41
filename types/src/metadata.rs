//! Free functions over a `ColumnDescriptor` or `EntityDescriptor`. These
//! exist mainly so call sites in `QueryBuilder` and the migration differ
//! read like the domain's own vocabulary; most are thin field accessors.

use crate::descriptor::{ColumnDescriptor, DefaultLiteral, EntityDescriptor, ForeignKeyDescriptor};

pub fn table_name(descriptor: &EntityDescriptor) -> &str {
    &descriptor.table_name
}

pub fn column_name(column: &ColumnDescriptor) -> &str {
    &column.name
}

pub fn primary_key(descriptor: &EntityDescriptor) -> &ColumnDescriptor {
    descriptor.primary_key()
}

pub fn is_auto_increment(column: &ColumnDescriptor) -> bool {
    column.is_auto_increment
}

pub fn is_nullable(column: &ColumnDescriptor) -> bool {
    column.nullable
}

pub fn is_unique(column: &ColumnDescriptor) -> bool {
    column.is_unique
}

pub fn default_value(column: &ColumnDescriptor) -> Option<&DefaultLiteral> {
    column.default_value.as_ref()
}

pub fn foreign_key(column: &ColumnDescriptor) -> Option<&ForeignKeyDescriptor> {
    column.foreign_key.as_ref()
}

pub fn column_length(column: &ColumnDescriptor) -> Option<u32> {
    column.length
}

/// Columns in declaration order. Navigation members (collections, and
/// single-entity fields tagged `#[entity(navigation)]`) are already
/// excluded by the derive macro at descriptor-construction time, so this
/// is just `&descriptor.columns` — kept as a named call so read sites read
/// like the rest of this module's vocabulary.
pub fn mapped_columns(descriptor: &EntityDescriptor) -> &[ColumnDescriptor] {
    &descriptor.columns
}

pub use crate::descriptor::column_definition;
