use std::fmt;

use crate::error::{Error, Result};

/// Declared kind of a record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    Null,
    /// Foreign key to another registered record type, named by its type name.
    Reference(String),
    /// Nullable wrapper around a base kind.
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn reference(type_name: impl Into<String>) -> Self {
        FieldType::Reference(type_name.into())
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// The kind with any `Optional` wrapper removed.
    pub fn unwrapped(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner,
            other => other,
        }
    }

    /// Target type name when the unwrapped kind is a reference.
    pub fn reference_target(&self) -> Option<&str> {
        match self.unwrapped() {
            FieldType::Reference(target) => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => write!(f, "integer"),
            FieldType::Real => write!(f, "real"),
            FieldType::Text => write!(f, "text"),
            FieldType::Blob => write!(f, "blob"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Null => write!(f, "null"),
            FieldType::Reference(target) => write!(f, "{}", target),
            FieldType::Optional(inner) => write!(f, "optional {}", inner),
        }
    }
}

/// SQLite column types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Real,
    Text,
    Blob,
    Null,
}

impl DataType {
    /// Map a base kind to its column type. Booleans and references are stored as integers.
    pub fn for_kind(field: &str, kind: &FieldType) -> Result<Self> {
        match kind {
            FieldType::Integer | FieldType::Boolean | FieldType::Reference(_) => {
                Ok(DataType::Integer)
            }
            FieldType::Real => Ok(DataType::Real),
            FieldType::Text => Ok(DataType::Text),
            FieldType::Blob => Ok(DataType::Blob),
            FieldType::Null => Ok(DataType::Null),
            FieldType::Optional(_) => Err(Error::UnsupportedKind {
                field: field.to_string(),
                kind: kind.to_string(),
            }),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Real => "REAL",
            DataType::Text => "TEXT",
            DataType::Blob => "BLOB",
            DataType::Null => "NULL",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
