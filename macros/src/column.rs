//! Parses the `#[entity(...)]` and `#[column(...)]` helper attributes.

use syn::{Attribute, LitInt, LitStr};

#[derive(Default)]
pub struct EntityAttrs {
    pub table: Option<String>,
}

impl EntityAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = EntityAttrs::default();
        for attr in attrs {
            if !attr.path().is_ident("entity") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    result.table = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `table = \"...\"`"))
                }
            })?;
        }
        Ok(result)
    }
}

#[derive(Default)]
pub struct ColumnAttrs {
    pub navigation: bool,
    pub name: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub length: Option<u32>,
    pub default: Option<String>,
    pub nullable_override: Option<bool>,
    pub references: Option<String>,
    pub references_column: Option<String>,
}

impl ColumnAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = ColumnAttrs::default();

        for attr in attrs {
            if attr.path().is_ident("entity") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("navigation") {
                        result.navigation = true;
                        Ok(())
                    } else {
                        Err(meta.error("expected `navigation`"))
                    }
                })?;
                continue;
            }

            if !attr.path().is_ident("column") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    result.primary_key = true;
                } else if meta.path.is_ident("auto_increment") {
                    result.auto_increment = true;
                } else if meta.path.is_ident("unique") {
                    result.unique = true;
                } else if meta.path.is_ident("nullable") {
                    result.nullable_override = Some(true);
                } else if meta.path.is_ident("not_nullable") {
                    result.nullable_override = Some(false);
                } else if meta.path.is_ident("name") {
                    result.name = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("length") {
                    result.length = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
                } else if meta.path.is_ident("default") {
                    result.default = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("references") {
                    result.references = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("references_column") {
                    result.references_column = Some(meta.value()?.parse::<LitStr>()?.value());
                } else {
                    return Err(meta.error("unrecognized `column` attribute argument"));
                }
                Ok(())
            })?;
        }

        if result.navigation && (result.primary_key || result.auto_increment || result.unique) {
            return Err(syn::Error::new_spanned(
                &attrs[0],
                "a navigation field cannot also carry column attributes",
            ));
        }

        Ok(result)
    }
}
