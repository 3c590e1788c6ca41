//! `#[derive(Entity)]`: builds the `EntityDescriptor` and `Entity` impl for
//! a mapped struct from its field declarations and `#[entity(...)]` /
//! `#[column(...)]` attributes.
//!
//! This crate never names `pgforge-types` as a dependency — it only emits
//! tokens rooted at `::pgforge::...`, resolved wherever the derive is
//! actually invoked (the root `pgforge` crate re-exports everything this
//! macro refers to). That keeps the proc-macro crate out of the dependency
//! cycle the root crate would otherwise form with its own macro.

mod column;
mod types;

use column::{ColumnAttrs, EntityAttrs};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields};
use types::FieldShape;

#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_ident = &input.ident;
    let entity_attrs = EntityAttrs::from_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Entity can only be derived for structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(&input.ident, "Entity can only be derived for structs")),
    };

    let table_name = entity_attrs.table.unwrap_or_else(|| format!("{struct_ident}s"));

    let mut column_defs = Vec::new();
    let mut column_value_arms = Vec::new();
    let mut set_column_value_arms = Vec::new();
    let mut from_row_fields = Vec::new();
    let mut primary_key_index: Option<usize> = None;

    for field in fields {
        let field_ident = field.ident.as_ref().expect("named field");
        let column_attrs = ColumnAttrs::from_attrs(&field.attrs)?;

        if column_attrs.navigation || types::is_collection_navigation(&field.ty) {
            from_row_fields.push(quote! { #field_ident: ::std::default::Default::default() });
            continue;
        }

        let shape = types::classify(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                "unrecognized column type; wrap navigation fields in `#[entity(navigation)]`",
            )
        })?;

        let column_name = column_attrs.name.clone().unwrap_or_else(|| field_ident.to_string());
        let nullable = column_attrs.nullable_override.unwrap_or(shape.optional);
        let sql_type_tokens = shape.sql_type_tokens();
        let length = match column_attrs.length {
            Some(n) => quote! { ::std::option::Option::Some(#n) },
            None => quote! { ::std::option::Option::None },
        };
        let default_tokens = match &column_attrs.default {
            Some(literal) => quote! {
                ::std::option::Option::Some(::pgforge::DefaultLiteral::Raw(#literal.to_string()))
            },
            None => quote! { ::std::option::Option::None },
        };
        let foreign_key_tokens = match &column_attrs.references {
            Some(table) => {
                let column = column_attrs.references_column.clone().unwrap_or_else(|| "Id".to_string());
                quote! {
                    ::std::option::Option::Some(::pgforge::ForeignKeyDescriptor {
                        reference_table: #table.to_string(),
                        reference_column: #column.to_string(),
                    })
                }
            }
            None => quote! { ::std::option::Option::None },
        };
        let is_primary_key = column_attrs.primary_key;
        let is_auto_increment = column_attrs.auto_increment;
        let is_unique = column_attrs.unique;

        if is_primary_key {
            if primary_key_index.is_some() {
                return Err(syn::Error::new_spanned(field_ident, "an entity can declare only one primary key"));
            }
            primary_key_index = Some(column_defs.len());
        }

        column_defs.push(quote! {
            ::pgforge::ColumnDescriptor {
                name: #column_name.to_string(),
                sql_type: #sql_type_tokens,
                nullable: #nullable,
                is_primary_key: #is_primary_key,
                is_auto_increment: #is_auto_increment,
                is_unique: #is_unique,
                default_value: #default_tokens,
                foreign_key: #foreign_key_tokens,
                length: #length,
            }
        });

        let to_sql_expr = to_sql_expr(field_ident, &shape);
        column_value_arms.push(quote! { #column_name => #to_sql_expr, });

        let from_owned = conversion_expr(&shape, quote! { &value });
        set_column_value_arms.push(quote! {
            #column_name => { self.#field_ident = (#from_owned).unwrap_or_default(); }
        });

        let from_ref = conversion_expr(&shape, quote! { __value });
        from_row_fields.push(quote! {
            #field_ident: match row.get(#column_name) {
                ::std::option::Option::Some(__value) => (#from_ref)?,
                ::std::option::Option::None => ::std::default::Default::default(),
            }
        });
    }

    let primary_key_index = primary_key_index.ok_or_else(|| {
        syn::Error::new_spanned(struct_ident, "an entity must declare exactly one #[column(primary_key)] field")
    })?;

    let descriptor_static = format_ident!("__{}_DESCRIPTOR", struct_ident.to_string().to_uppercase());

    Ok(quote! {
        impl ::pgforge::Entity for #struct_ident {
            fn descriptor() -> &'static ::pgforge::EntityDescriptor {
                static #descriptor_static: ::std::sync::OnceLock<::pgforge::EntityDescriptor> = ::std::sync::OnceLock::new();
                #descriptor_static.get_or_init(|| ::pgforge::EntityDescriptor {
                    table_name: #table_name.to_string(),
                    columns: ::std::vec![ #(#column_defs),* ],
                    primary_key_index: #primary_key_index,
                })
            }

            fn column_value(&self, column: &::pgforge::ColumnDescriptor) -> ::pgforge::SqlValue {
                match column.name.as_str() {
                    #(#column_value_arms)*
                    _ => ::pgforge::SqlValue::Null,
                }
            }

            fn set_column_value(&mut self, column: &::pgforge::ColumnDescriptor, value: ::pgforge::SqlValue) {
                match column.name.as_str() {
                    #(#set_column_value_arms)*
                    _ => {}
                }
            }

            fn from_row(row: &::pgforge::RowData) -> ::pgforge::Result<Self> {
                ::std::result::Result::Ok(Self {
                    #(#from_row_fields),*
                })
            }
        }
    })
}

/// The `column_value` expression for one mapped field: enum-shaped columns
/// route through `EnumColumn` so they don't rely on a blanket impl over
/// every `SqlEnum` type.
fn to_sql_expr(field_ident: &syn::Ident, shape: &FieldShape) -> TokenStream2 {
    match (shape.is_enum, shape.optional) {
        (true, true) => quote! {
            match &self.#field_ident {
                ::std::option::Option::Some(v) => ::pgforge::ToSqlValue::to_sql_value(&::pgforge::EnumColumn(v.clone())),
                ::std::option::Option::None => ::pgforge::SqlValue::Null,
            }
        },
        (true, false) => quote! {
            ::pgforge::ToSqlValue::to_sql_value(&::pgforge::EnumColumn(self.#field_ident.clone()))
        },
        (false, _) => quote! { ::pgforge::ToSqlValue::to_sql_value(&self.#field_ident) },
    }
}

/// A `Result<FieldType, PgForgeError>` expression reading the field's value
/// out of `value_expr` (a `&SqlValue`). Shared between `set_column_value`
/// (unwrapped with a default on error) and `from_row` (propagated with `?`).
fn conversion_expr(shape: &FieldShape, value_expr: TokenStream2) -> TokenStream2 {
    let inner_ty = &shape.rust_type;
    match (shape.is_enum, shape.optional) {
        (true, true) => quote! {
            if #value_expr.is_null() {
                ::std::result::Result::Ok(::std::option::Option::None)
            } else {
                <::pgforge::EnumColumn<#inner_ty> as ::pgforge::FromSqlValue>::from_sql_value(#value_expr)
                    .map(|wrapped| ::std::option::Option::Some(wrapped.0))
            }
        },
        (true, false) => quote! {
            <::pgforge::EnumColumn<#inner_ty> as ::pgforge::FromSqlValue>::from_sql_value(#value_expr)
                .map(|wrapped| wrapped.0)
        },
        (false, true) => quote! {
            <::std::option::Option<#inner_ty> as ::pgforge::FromSqlValue>::from_sql_value(#value_expr)
        },
        (false, false) => quote! {
            <#inner_ty as ::pgforge::FromSqlValue>::from_sql_value(#value_expr)
        },
    }
}
