//! Error types shared by every part of the ORM.

use thiserror::Error;

use crate::definitions::FieldKind;

/// Errors raised by the analyzer, the mapper, the DOA and the SQL generator.
#[derive(Debug, Error)]
pub enum Error {
    /// The declared type is neither a field kind nor an optional field kind.
    #[error("annotation `{0}` cannot be converted to a field kind")]
    NonConvertableAnnotation(String),

    /// A union was declared without a null alternative, or with more than one real type.
    #[error("annotation `{0}` is a dynamic type; only optional field kinds are allowed")]
    ForbiddenDynamicType(String),

    /// `create()` was called without exactly one of an entity or a set of attributes.
    #[error("creation error: {0}")]
    Creation(String),

    /// `save()` had nothing to put in the SET clause.
    #[error("nothing to update for {0}")]
    NoUpdate(String),

    /// `refresh()` found no row for the entity's identifiers.
    #[error("{0} has been removed from the storage")]
    EntityRemoved(String),

    /// The model has no identifier fields, so a row cannot be addressed.
    #[error("model `{0}` has no identifier fields")]
    MissingIdentity(String),

    #[error("unknown saved query `{0}`")]
    UnknownSavedQuery(String),

    /// The dialect has no DDL type for a field kind.
    #[error("dialect `{dialect}` has no column type for {kind}")]
    MissingColumnType { dialect: &'static str, kind: FieldKind },

    #[error("constraint `{0}` has no field names")]
    EmptyConstraint(String),

    /// A row carried a column the specification does not map.
    #[error("unknown field `{field}` for `{model}`")]
    UnknownField { model: String, field: String },

    #[error("unknown attribute `{attribute}` for `{model}`")]
    UnknownAttribute { model: String, attribute: String },

    #[error("missing value for attribute `{0}`")]
    MissingAttribute(String),

    #[error("cannot convert {found} to {expected}")]
    Conversion { expected: &'static str, found: String },

    /// The SQL text referenced a named parameter that was not supplied.
    #[error("missing parameter `:{0}`")]
    MissingParameter(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn conversion(expected: &'static str, found: impl std::fmt::Debug) -> Self {
        Error::Conversion { expected, found: format!("{found:?}") }
    }
}

/// Result type alias for ORM operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
