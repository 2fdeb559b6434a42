//! # Type Definitions
//!
//! The fixed set of semantic field kinds a model may declare, the typed
//! description of a declared attribute type ([`Annotation`]) and the
//! [`FieldValue`] trait that ties a Rust type to both.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref};

use crate::{Error, Result, Value};

// ============================================================================
// Field Kinds
// ============================================================================

/// Semantic column type of a mapped attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// UUID-like string identifier.
    Identifier,
    String,
    Boolean,
    Integer,
    Float,
    Text,
    LongText,
    Timestamp,
}

impl FieldKind {
    pub const ALL: [FieldKind; 8] = [
        FieldKind::Identifier,
        FieldKind::String,
        FieldKind::Boolean,
        FieldKind::Integer,
        FieldKind::Float,
        FieldKind::Text,
        FieldKind::LongText,
        FieldKind::Timestamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Identifier => "Identifier",
            FieldKind::String => "String",
            FieldKind::Boolean => "Boolean",
            FieldKind::Integer => "Integer",
            FieldKind::Float => "Float",
            FieldKind::Text => "Text",
            FieldKind::LongText => "LongText",
            FieldKind::Timestamp => "Timestamp",
        }
    }

    /// Casts a raw value to the underlying primitive of this kind.
    ///
    /// Values that already carry the right primitive are returned as they
    /// are; `Null` always passes through.
    pub fn coerce(self, value: Value) -> Result<Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),

            (FieldKind::Boolean, Value::Boolean(v)) => Ok(Value::Boolean(v)),
            (FieldKind::Boolean, Value::Integer(v)) => Ok(Value::Boolean(v != 0)),
            (FieldKind::Boolean, Value::String(v)) => match v.as_str() {
                "1" | "true" | "TRUE" => Ok(Value::Boolean(true)),
                "0" | "false" | "FALSE" => Ok(Value::Boolean(false)),
                _ => Err(Error::conversion("Boolean", v)),
            },

            (FieldKind::Integer, Value::Integer(v)) => Ok(Value::Integer(v)),
            (FieldKind::Integer, Value::Boolean(v)) => Ok(Value::Integer(i64::from(v))),
            (FieldKind::Integer, Value::Float(v)) => {
                let whole = v.trunc();
                if whole.is_finite() && whole >= i64::MIN as f64 && whole < i64::MAX as f64 {
                    Ok(Value::Integer(whole as i64))
                } else {
                    Err(Error::conversion("Integer", v))
                }
            }
            (FieldKind::Integer, Value::String(v)) => {
                v.trim().parse().map(Value::Integer).map_err(|_| Error::conversion("Integer", v))
            }

            (FieldKind::Float, Value::Float(v)) => Ok(Value::Float(v)),
            (FieldKind::Float, Value::Integer(v)) => Ok(Value::Float(v as f64)),
            (FieldKind::Float, Value::String(v)) => {
                v.trim().parse().map(Value::Float).map_err(|_| Error::conversion("Float", v))
            }

            (FieldKind::Timestamp, Value::Timestamp(v)) => Ok(Value::Timestamp(v)),
            (FieldKind::Timestamp, Value::String(v)) => parse_timestamp(&v).map(Value::Timestamp),

            (
                FieldKind::Identifier | FieldKind::String | FieldKind::Text | FieldKind::LongText,
                value,
            ) => Ok(Value::String(match value {
                Value::String(v) => v,
                Value::Timestamp(v) => v.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                other => other.to_string(),
            })),

            (kind, other) => Err(Error::conversion(kind.name(), other)),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the textual timestamps drivers hand back (RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]`).
pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::conversion("Timestamp", text))
}

// ============================================================================
// Declared Types
// ============================================================================

/// The declared type of a model attribute.
///
/// `Option<T>` declares `Union([T, Null])`; everything the analyzer cannot
/// map is kept as `Generic` or `Opaque` so the failure names the type.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Kind(FieldKind),
    Null,
    Union(Vec<Annotation>),
    Generic { name: &'static str, arguments: Vec<Annotation> },
    Opaque(&'static str),
}

impl Annotation {
    pub fn optional(inner: Annotation) -> Self {
        Annotation::Union(vec![inner, Annotation::Null])
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Kind(kind) => write!(f, "{kind}"),
            Annotation::Null => f.write_str("Null"),
            Annotation::Union(members) => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "Union<{}>", members.join(", "))
            }
            Annotation::Generic { name, arguments } => {
                let arguments: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                write!(f, "{name}<{}>", arguments.join(", "))
            }
            Annotation::Opaque(name) => f.write_str(name),
        }
    }
}

/// Resolved shape of an attribute: a field kind, or an optional field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Concrete(FieldKind),
    OptionalOf(FieldKind),
}

impl FieldShape {
    pub fn kind(self) -> FieldKind {
        match self {
            FieldShape::Concrete(kind) | FieldShape::OptionalOf(kind) => kind,
        }
    }

    pub fn nullable(self) -> bool {
        matches!(self, FieldShape::OptionalOf(_))
    }
}

// ============================================================================
// Field Values
// ============================================================================

/// A Rust type that can be stored in a mapped attribute.
pub trait FieldValue: Sized {
    /// Declared type of the attribute, inspected by the analyzer.
    fn annotation() -> Annotation;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

impl FieldValue for String {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::String)
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(Error::conversion("String", other)),
        }
    }
}

impl FieldValue for uuid::Uuid {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Identifier)
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(v) => v.parse().map_err(|_| Error::conversion("Identifier", v)),
            other => Err(Error::conversion("Identifier", other)),
        }
    }
}

impl FieldValue for bool {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Boolean)
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Integer(v) => Ok(v != 0),
            other => Err(Error::conversion("Boolean", other)),
        }
    }
}

impl FieldValue for i64 {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Integer)
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(Error::conversion("Integer", other)),
        }
    }
}

impl FieldValue for i32 {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Integer)
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => i32::try_from(v).map_err(|_| Error::conversion("i32", v)),
            other => Err(Error::conversion("Integer", other)),
        }
    }
}

impl FieldValue for f64 {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(Error::conversion("Float", other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Timestamp)
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::String(v) => parse_timestamp(&v),
            other => Err(Error::conversion("Timestamp", other)),
        }
    }
}

impl FieldValue for NaiveDateTime {
    fn annotation() -> Annotation {
        Annotation::Kind(FieldKind::Timestamp)
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(self.and_utc())
    }

    fn from_value(value: Value) -> Result<Self> {
        DateTime::<Utc>::from_value(value).map(|v| v.naive_utc())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn annotation() -> Annotation {
        Annotation::optional(T::annotation())
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

// ============================================================================
// Text Kinds
// ============================================================================

macro_rules! text_kind {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl FieldValue for $name {
            fn annotation() -> Annotation {
                Annotation::Kind(FieldKind::$kind)
            }

            fn to_value(&self) -> Value {
                Value::String(self.0.clone())
            }

            fn from_value(value: Value) -> Result<Self> {
                String::from_value(value).map($name)
            }
        }
    };
}

text_kind!(
    /// Unbounded text column (`TEXT`).
    Text => Text
);

text_kind!(
    /// Large text column (`LONGTEXT`).
    LongText => LongText
);
