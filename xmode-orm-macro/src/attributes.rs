//! Parsing of `#[orm(...)]` attributes.

use syn::{Attribute, Lit, LitBool, LitStr, Path, Result};

#[derive(Default)]
pub struct SavedQueryOptions {
    pub name: Option<LitStr>,
    pub query: Option<LitStr>,
    pub auto_mapping: bool,
}

pub struct ConstraintOptions {
    pub kind: LitStr,
    pub fields: Vec<String>,
    pub extras: Option<LitStr>,
}

/// Struct-level options.
#[derive(Default)]
pub struct ContainerOptions {
    pub stored_in: Option<LitStr>,
    pub save_queries: Vec<SavedQueryOptions>,
    pub constraints: Vec<ConstraintOptions>,
}

/// Field-level options.
#[derive(Default)]
pub struct FieldOptions {
    pub id: bool,
    pub column: Option<LitStr>,
    pub unique: bool,
    pub index: bool,
    pub default: Option<Lit>,
    pub default_with: Option<Path>,
}

pub fn container_options(attrs: &[Attribute]) -> Result<ContainerOptions> {
    let mut options = ContainerOptions::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("stored_in") {
                options.stored_in = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("save_query") {
                let mut saved = SavedQueryOptions { auto_mapping: true, ..Default::default() };
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("name") {
                        saved.name = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("query") {
                        saved.query = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("auto_mapping") {
                        saved.auto_mapping = inner.value()?.parse::<LitBool>()?.value;
                    } else {
                        return Err(inner.error("expected `name`, `query` or `auto_mapping`"));
                    }
                    Ok(())
                })?;
                if saved.name.is_none() || saved.query.is_none() {
                    return Err(meta.error("save_query needs both `name` and `query`"));
                }
                options.save_queries.push(saved);
            } else if meta.path.is_ident("constraint") {
                let mut kind = None;
                let mut fields = Vec::new();
                let mut extras = None;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("kind") {
                        kind = Some(inner.value()?.parse::<LitStr>()?);
                    } else if inner.path.is_ident("fields") {
                        let list: LitStr = inner.value()?.parse()?;
                        fields = list
                            .value()
                            .split(',')
                            .map(str::trim)
                            .filter(|f| !f.is_empty())
                            .map(str::to_string)
                            .collect();
                    } else if inner.path.is_ident("extras") {
                        extras = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `kind`, `fields` or `extras`"));
                    }
                    Ok(())
                })?;
                let Some(kind) = kind else {
                    return Err(meta.error("constraint needs a `kind`"));
                };
                options.constraints.push(ConstraintOptions { kind, fields, extras });
            } else {
                return Err(meta.error("unsupported orm attribute"));
            }
            Ok(())
        })?;
    }

    Ok(options)
}

pub fn field_options(attrs: &[Attribute]) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                options.id = true;
            } else if meta.path.is_ident("column") {
                options.column = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("unique") {
                options.unique = true;
            } else if meta.path.is_ident("index") {
                options.index = true;
            } else if meta.path.is_ident("default") {
                options.default = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default_with") {
                options.default_with = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported orm attribute"));
            }
            Ok(())
        })?;
    }

    Ok(options)
}
