//! # SQL Generator
//!
//! Derives CREATE TABLE statements from a [`ClassSpecification`]. Each
//! database flavour is a [`Dialect`]; only [`MySql`] ships with the crate.

use crate::{ClassSpecification, Error, FieldKind, Model, Result, analyze};

/// Dialect-specific DDL generation.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// DDL type of a field kind, `None` if the dialect has no mapping for it.
    fn column_type(&self, kind: FieldKind) -> Option<&'static str>;

    /// Quote an identifier (column name).
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{name}`")
    }

    /// Builds `CREATE TABLE <name> (<columns>, PRIMARY KEY (..), <constraints>)`.
    fn generate_create_query(&self, spec: &ClassSpecification) -> Result<String> {
        let mut definitions = Vec::with_capacity(spec.mappings.len() + spec.constraints.len() + 1);

        for mapping in &spec.mappings {
            let db_type = self
                .column_type(mapping.field_type)
                .ok_or(Error::MissingColumnType { dialect: self.name(), kind: mapping.field_type })?;
            let nullability = if mapping.nullable { "NULL DEFAULT NULL" } else { "NOT NULL" };
            definitions.push(format!("{} {db_type} {nullability}", self.quote_identifier(&mapping.field_name)));
        }

        if !spec.id_fields.is_empty() {
            let keys = spec
                .id_fields
                .iter()
                .map(|attr| spec.field_name(attr).map(|field| self.quote_identifier(field)))
                .collect::<Result<Vec<_>>>()?;
            definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        for constraint in &spec.constraints {
            if constraint.field_names.is_empty() {
                return Err(Error::EmptyConstraint(constraint.kind.clone()));
            }
            let fields: Vec<String> = constraint.field_names.iter().map(|f| self.quote_identifier(f)).collect();
            let clause = format!(
                "{} ({}) {}",
                constraint.kind.to_uppercase(),
                fields.join(", "),
                constraint.extras.as_deref().unwrap_or("")
            );
            definitions.push(clause.trim().to_string());
        }

        Ok(format!("CREATE TABLE {} ({})", spec.name, definitions.join(", ")))
    }

    /// Analyzes `T` and builds its CREATE TABLE statement.
    fn convert_class_to_create_query<T: Model>(&self) -> Result<String>
    where
        Self: Sized,
    {
        let spec = analyze::<T>()?;
        let spec = spec.read();
        self.generate_create_query(&spec)
    }
}

/// MySQL / MariaDB dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn column_type(&self, kind: FieldKind) -> Option<&'static str> {
        Some(match kind {
            FieldKind::Identifier => "VARCHAR(36)",
            FieldKind::String => "VARCHAR(255)",
            FieldKind::Boolean => "TINYINT(1)",
            FieldKind::Integer => "INTEGER(11)",
            FieldKind::Float => "DOUBLE",
            FieldKind::Text => "TEXT",
            FieldKind::LongText => "LONGTEXT",
            FieldKind::Timestamp => "DATETIME",
        })
    }
}
