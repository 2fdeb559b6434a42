//! # Schema Analyzer
//!
//! Derives a [`ClassSpecification`] from a model's declared attributes and
//! keeps exactly one per type for the lifetime of the process. Registration
//! functions (`stored_in`, `identified_by`, `constraint`, `default`,
//! `save_query`) mutate that one instance, in any order.

use once_cell::sync::Lazy;
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    Annotation, ClassSpecification, Constraint, Error, FieldShape, Model, Result, SavedQuery, Value,
    model::AttributeDeclaration, specification::{DefaultValue, MappingDefinition},
};

// ============================================================================
// Registry
// ============================================================================

static REGISTRY: Lazy<RwLock<HashMap<TypeId, Specification>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Shared handle to the cached specification of one model type.
///
/// Every call to [`analyze`] for the same type returns a clone of the same handle.
#[derive(Debug, Clone)]
pub struct Specification(Arc<RwLock<ClassSpecification>>);

impl Specification {
    pub fn read(&self) -> RwLockReadGuard<'_, ClassSpecification> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ClassSpecification> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles point at the same specification.
    pub fn same_as(&self, other: &Specification) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Returns the specification of `T`, analyzing the type on first use.
pub fn analyze<T: Model>() -> Result<Specification> {
    let key = TypeId::of::<T>();

    if let Some(found) = REGISTRY.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
        return Ok(found.clone());
    }

    // Built with no registry lock held, so `declare` may analyze other models.
    let mut spec = ClassSpecification::new(T::model_name().to_lowercase());
    spec.mappings = T::declared_attributes()
        .into_iter()
        .filter(|declaration| !declaration.name.starts_with('_'))
        .map(analyze_mapping)
        .collect::<Result<_>>()?;
    T::declare(&mut Registrar::new(&mut spec));

    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(found) = registry.get(&key) {
        return Ok(found.clone());
    }

    log::debug!("analyzed `{}` into table `{}` ({} mappings)", T::model_name(), spec.name, spec.mappings.len());

    let handle = Specification(Arc::new(RwLock::new(spec)));
    registry.insert(key, handle.clone());
    Ok(handle)
}

fn analyze_mapping(declaration: AttributeDeclaration) -> Result<MappingDefinition> {
    let shape = resolve(&declaration.annotation)?;
    Ok(MappingDefinition {
        attr_name: declaration.name.to_string(),
        field_name: declaration.column.unwrap_or(declaration.name).to_string(),
        attr_type: declaration.annotation,
        field_type: shape.kind(),
        nullable: shape.nullable(),
    })
}

/// Resolves a declared type to a field kind or an optional field kind.
pub fn resolve(annotation: &Annotation) -> Result<FieldShape> {
    match annotation {
        Annotation::Kind(kind) => Ok(FieldShape::Concrete(*kind)),
        Annotation::Union(members) => {
            if !members.contains(&Annotation::Null) {
                return Err(Error::ForbiddenDynamicType(annotation.to_string()));
            }

            let mut concrete = members.iter().filter(|member| **member != Annotation::Null);
            match (concrete.next(), concrete.next()) {
                (Some(Annotation::Kind(kind)), None) => Ok(FieldShape::OptionalOf(*kind)),
                (Some(_), Some(_)) => Err(Error::ForbiddenDynamicType(annotation.to_string())),
                (Some(other), None) => Err(Error::NonConvertableAnnotation(other.to_string())),
                (None, _) => Err(Error::NonConvertableAnnotation(annotation.to_string())),
            }
        }
        other => Err(Error::NonConvertableAnnotation(other.to_string())),
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Mutable view over a specification, used by `Model::declare` and [`register`].
pub struct Registrar<'a> {
    spec: &'a mut ClassSpecification,
}

/// Field names of a constraint: one name or an ordered collection of names.
pub trait IntoFieldNames {
    fn into_field_names(self) -> Vec<String>;
}

impl IntoFieldNames for &str {
    fn into_field_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoFieldNames for String {
    fn into_field_names(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: Into<String>, const N: usize> IntoFieldNames for [S; N] {
    fn into_field_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String>> IntoFieldNames for Vec<S> {
    fn into_field_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: AsRef<str>> IntoFieldNames for &[S] {
    fn into_field_names(self) -> Vec<String> {
        self.iter().map(|name| name.as_ref().to_string()).collect()
    }
}

impl<'a> Registrar<'a> {
    pub fn new(spec: &'a mut ClassSpecification) -> Self {
        Self { spec }
    }

    pub fn stored_in(&mut self, table_name: impl Into<String>) -> &mut Self {
        self.spec.name = table_name.into();
        self
    }

    pub fn identified_by<I, S>(&mut self, attr_names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.id_fields.extend(attr_names.into_iter().map(Into::into));
        self
    }

    pub fn constraint(&mut self, kind: impl Into<String>, field_names: impl IntoFieldNames, extras: Option<&str>) -> &mut Self {
        self.spec.constraints.push(Constraint {
            kind: kind.into(),
            field_names: field_names.into_field_names(),
            extras: extras.map(str::to_string),
        });
        self
    }

    /// Constant default for an attribute absent at creation time.
    pub fn default(&mut self, attr_name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.spec.defaults.insert(attr_name.into(), DefaultValue::Constant(value.into()));
        self
    }

    /// Default produced anew on every creation.
    pub fn default_with<F>(&mut self, attr_name: impl Into<String>, producer: F) -> &mut Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.spec.defaults.insert(attr_name.into(), DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn save_query(&mut self, name: impl Into<String>, query: impl Into<String>, auto_mapping: bool) -> &mut Self {
        self.spec.saved_queries.push(SavedQuery { name: name.into(), query: query.into(), auto_mapping });
        self
    }
}

/// Applies registrations to the specification of `T`.
///
/// ```rust,ignore
/// analyzer::register::<Task>(|r| {
///     r.stored_in("tasks").identified_by(["id"]).default("status", "new");
/// })?;
/// ```
pub fn register<T: Model>(apply: impl FnOnce(&mut Registrar<'_>)) -> Result<Specification> {
    let spec = analyze::<T>()?;
    {
        let mut guard = spec.write();
        apply(&mut Registrar::new(&mut guard));
    }
    Ok(spec)
}

pub fn stored_in<T: Model>(table_name: impl Into<String>) -> Result<()> {
    register::<T>(|r| {
        r.stored_in(table_name);
    })
    .map(drop)
}

pub fn identified_by<T: Model>(attr_names: impl IntoIterator<Item = impl Into<String>>) -> Result<()> {
    register::<T>(|r| {
        r.identified_by(attr_names);
    })
    .map(drop)
}

pub fn constraint<T: Model>(kind: impl Into<String>, field_names: impl IntoFieldNames, extras: Option<&str>) -> Result<()> {
    register::<T>(|r| {
        r.constraint(kind, field_names, extras);
    })
    .map(drop)
}

pub fn default<T: Model>(attr_name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
    register::<T>(|r| {
        r.default(attr_name, value);
    })
    .map(drop)
}

pub fn default_with<T: Model>(
    attr_name: impl Into<String>,
    producer: impl Fn() -> Value + Send + Sync + 'static,
) -> Result<()> {
    register::<T>(|r| {
        r.default_with(attr_name, producer);
    })
    .map(drop)
}

pub fn save_query<T: Model>(name: impl Into<String>, query: impl Into<String>, auto_mapping: bool) -> Result<()> {
    register::<T>(|r| {
        r.save_query(name, query, auto_mapping);
    })
    .map(drop)
}
