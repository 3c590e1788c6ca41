//! Maps a field's Rust type onto a mapped-column shape, or recognizes it as
//! a navigation field with no column at all.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, PathArguments, Type};

pub struct FieldShape {
    /// `true` if the field is `Option<T>`.
    pub optional: bool,
    /// `true` if `rust_type` isn't one of the built-in leaf types — treated
    /// as an application enum stored via `EnumColumn`/`SqlEnum`.
    pub is_enum: bool,
    /// The type with any `Option<_>` wrapper stripped off.
    pub rust_type: Type,
    sql_type: &'static str,
}

impl FieldShape {
    pub fn sql_type_tokens(&self) -> TokenStream {
        let variant = syn::Ident::new(self.sql_type, proc_macro2::Span::call_site());
        quote! { ::pgforge::SqlType::#variant }
    }
}

/// `Vec<T>` where `T != u8` is always a collection navigation field, with no
/// attribute required — `Vec<u8>` is the one byte-sequence column type.
pub fn is_collection_navigation(ty: &Type) -> bool {
    match vec_inner(ty) {
        Some(inner) => !is_u8(inner),
        None => false,
    }
}

pub fn classify(ty: &Type) -> Option<FieldShape> {
    let (optional, inner) = match option_inner(ty) {
        Some(inner) => (true, inner),
        None => (false, ty),
    };

    if let Some(byte_ty) = vec_inner(inner) {
        if is_u8(byte_ty) {
            return Some(FieldShape { optional, is_enum: false, rust_type: inner.clone(), sql_type: "Bytes" });
        }
        return None;
    }

    let Some(leaf) = leaf_sql_type(inner) else {
        // Not a recognized leaf type: treat it as an application enum,
        // stored as an INTEGER ordinal via `SqlEnum`/`EnumColumn`.
        return Some(FieldShape { optional, is_enum: true, rust_type: inner.clone(), sql_type: "EnumOrdinal" });
    };

    Some(FieldShape { optional, is_enum: false, rust_type: inner.clone(), sql_type: leaf })
}

fn leaf_sql_type(ty: &Type) -> Option<&'static str> {
    let ident = last_segment_ident(ty)?;
    Some(match ident.as_str() {
        "i16" => "SmallInt",
        "i32" => "Integer",
        "i64" => "BigInt",
        "f32" => "Real",
        "f64" => "DoublePrecision",
        "bool" => "Boolean",
        "char" => "Char",
        "String" => "String",
        "Decimal" => "Decimal",
        "NaiveDateTime" => "Timestamp",
        "DateTime" => "TimestampTz",
        "Uuid" => "Uuid",
        _ => return None,
    })
}

fn last_segment_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|seg| seg.ident.to_string()),
        _ => None,
    }
}

fn is_u8(ty: &Type) -> bool {
    last_segment_ident(ty).as_deref() == Some("u8")
}

fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

fn vec_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Vec")
}

fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else { return None };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
