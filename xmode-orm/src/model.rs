//! # Model Module
//!
//! This module defines the `Model` trait that every mapped data type
//! implements, along with the per-attribute declaration it reports to the
//! analyzer.
//!
//! ## Automatic Implementation
//!
//! The trait is normally implemented by `#[derive(Model)]`, which reads the
//! struct fields and `#[orm(...)]` attributes:
//!
//! ```rust,ignore
//! use xmode_orm::{Model, Text};
//! use uuid::Uuid;
//!
//! #[derive(Model, Debug, Clone)]
//! #[orm(stored_in = "articles", save_query(name = "latest", query = "SELECT * FROM articles LIMIT 10"))]
//! struct Article {
//!     #[orm(id)]
//!     id: Uuid,
//!     #[orm(column = "headline", unique)]
//!     title: String,
//!     body: Option<Text>,
//!     #[orm(default = false)]
//!     published: bool,
//!     _rendered: Option<String>,
//! }
//! ```
//!
//! ## Supported ORM Attributes
//!
//! - `#[orm(stored_in = "name")]` - Table name (default: lower-cased struct name)
//! - `#[orm(save_query(name = "..", query = "..", auto_mapping = false))]` - Saved query
//! - `#[orm(constraint(kind = "..", fields = "a, b", extras = ".."))]` - Table constraint
//! - `#[orm(id)]` - Part of the identity (primary key)
//! - `#[orm(column = "name")]` - Column name (default: field name)
//! - `#[orm(unique)]` / `#[orm(index)]` - Single-column constraint
//! - `#[orm(default = literal)]` - Constant default applied on creation
//! - `#[orm(default_with = path)]` - Producer called on every creation
//!
//! Fields whose name starts with `_` are not persisted.

use crate::{Attributes, Error, FieldValue, Result, Value, analyzer::Registrar, definitions::Annotation};

/// Declared attribute of a model, as reported by [`Model::declared_attributes`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDeclaration {
    /// Attribute (struct field) name.
    pub name: &'static str,
    /// Declared type.
    pub annotation: Annotation,
    /// Column name, when it differs from the attribute name.
    pub column: Option<&'static str>,
}

impl AttributeDeclaration {
    pub fn new(name: &'static str, annotation: Annotation) -> Self {
        Self { name, annotation, column: None }
    }

    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }
}

/// A data type mapped to a table.
///
/// # Example Manual Implementation
///
/// ```rust,ignore
/// use xmode_orm::{Attributes, AttributeDeclaration, FieldValue, Model, Registrar, Result, Value};
/// use xmode_orm::model::{take_attribute, unknown_attribute};
///
/// struct Tag {
///     name: String,
/// }
///
/// impl Model for Tag {
///     fn model_name() -> &'static str { "Tag" }
///
///     fn declared_attributes() -> Vec<AttributeDeclaration> {
///         vec![AttributeDeclaration::new("name", String::annotation())]
///     }
///
///     fn declare(registrar: &mut Registrar<'_>) {
///         registrar.identified_by(["name"]);
///     }
///
///     fn attribute(&self, name: &str) -> Option<Value> {
///         (name == "name").then(|| self.name.to_value())
///     }
///
///     fn set_attribute(&mut self, name: &str, value: Value) -> Result<()> {
///         match name {
///             "name" => self.name = String::from_value(value)?,
///             other => return Err(unknown_attribute::<Self>(other)),
///         }
///         Ok(())
///     }
///
///     fn from_attributes(mut attributes: Attributes) -> Result<Self> {
///         Ok(Tag { name: take_attribute(&mut attributes, "name")? })
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// Type name; the default table name is its lower-cased form.
    fn model_name() -> &'static str;

    /// Attributes in declaration order, including `_`-prefixed ones if the
    /// implementation chooses to report them (the analyzer skips those).
    fn declared_attributes() -> Vec<AttributeDeclaration>;

    /// Registrations applied once, when the type is first analyzed.
    ///
    /// May analyze other models. Registering against `Self` through the free
    /// functions in [`analyzer`](crate::analyzer) recurses; use the registrar.
    fn declare(_registrar: &mut Registrar<'_>) {}

    /// Current value of an attribute, `None` if the model has no such attribute.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Overwrites one attribute in place.
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<()>;

    /// Builds an instance from attribute name -> value.
    fn from_attributes(attributes: Attributes) -> Result<Self>;
}

/// Removes `name` from `attributes` and converts it.
///
/// An absent attribute is read as `Null`, which only optional attributes accept.
pub fn take_attribute<V: FieldValue>(attributes: &mut Attributes, name: &str) -> Result<V> {
    match attributes.shift_remove(name) {
        Some(value) => V::from_value(value),
        None => V::from_value(Value::Null).map_err(|_| Error::MissingAttribute(name.to_string())),
    }
}

pub fn unknown_attribute<T: Model>(name: &str) -> Error {
    Error::UnknownAttribute { model: T::model_name().to_string(), attribute: name.to_string() }
}
