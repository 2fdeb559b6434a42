//! # Specification Model
//!
//! Passive description of one mapped type: its table, columns, identity,
//! defaults, constraints and saved queries.

use indexmap::{IndexMap, IndexSet};
use std::{collections::BTreeSet, fmt, sync::Arc};

use crate::{Annotation, Error, FieldKind, Result, Value};

/// One mapped attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingDefinition {
    pub attr_name: String,
    pub attr_type: Annotation,
    pub field_name: String,
    pub field_type: FieldKind,
    pub nullable: bool,
}

/// Table-level constraint, rendered as `<KIND> (<fields>) <extras>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Dialect keyword such as `unique` or `index`.
    pub kind: String,
    pub field_names: Vec<String>,
    /// Raw SQL appended verbatim.
    pub extras: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQuery {
    pub name: String,
    pub query: String,
    /// Whether rows are mapped back to the model or returned as they are.
    pub auto_mapping: bool,
}

/// Value used for an attribute missing at creation time.
#[derive(Clone)]
pub enum DefaultValue {
    Constant(Value),
    /// Called once per creation.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Constant(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Schema and behavior metadata of one model type.
#[derive(Debug, Clone)]
pub struct ClassSpecification {
    /// Table name.
    pub name: String,
    pub mappings: Vec<MappingDefinition>,
    /// Attribute names forming the identity, sorted and unique.
    pub id_fields: BTreeSet<String>,
    pub defaults: IndexMap<String, DefaultValue>,
    pub constraints: Vec<Constraint>,
    pub saved_queries: Vec<SavedQuery>,
}

impl ClassSpecification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
            id_fields: BTreeSet::new(),
            defaults: IndexMap::new(),
            constraints: Vec::new(),
            saved_queries: Vec::new(),
        }
    }

    pub fn attribute_to_field_map(&self) -> IndexMap<String, String> {
        self.mappings.iter().map(|m| (m.attr_name.clone(), m.field_name.clone())).collect()
    }

    pub fn field_to_attribute_map(&self) -> IndexMap<String, String> {
        self.mappings.iter().map(|m| (m.field_name.clone(), m.attr_name.clone())).collect()
    }

    /// Column name -> field kind.
    pub fn field_kinds(&self) -> IndexMap<String, FieldKind> {
        self.mappings.iter().map(|m| (m.field_name.clone(), m.field_type)).collect()
    }

    /// Attribute names of the nullable mappings.
    pub fn nullable_attribute_names(&self) -> IndexSet<String> {
        self.mappings.iter().filter(|m| m.nullable).map(|m| m.attr_name.clone()).collect()
    }

    pub fn mapping(&self, attr_name: &str) -> Option<&MappingDefinition> {
        self.mappings.iter().find(|m| m.attr_name == attr_name)
    }

    /// First saved query registered under `name`.
    pub fn saved_query(&self, name: &str) -> Result<&SavedQuery> {
        self.saved_queries
            .iter()
            .find(|q| q.name == name)
            .ok_or_else(|| Error::UnknownSavedQuery(name.to_string()))
    }

    /// Column name of an attribute.
    pub fn field_name(&self, attr_name: &str) -> Result<&str> {
        self.mapping(attr_name).map(|m| m.field_name.as_str()).ok_or_else(|| Error::UnknownAttribute {
            model: self.name.clone(),
            attribute: attr_name.to_string(),
        })
    }
}
