use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::Model;
use crate::types::{DataType, FieldType};
use crate::value::Value;

/// Name of the synthetic identity column every record type carries.
pub const IDENTITY_FIELD: &str = "id";

/// Per-field metadata: declared kind, resolved column type and, for
/// references, the record type the stored integer points at.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    declared: FieldType,
    storage: DataType,
    target: Option<Arc<Model>>,
}

impl FieldDescriptor {
    /// Build a descriptor. `target` must be the registered model when the
    /// declared kind is a reference.
    pub(crate) fn new(
        name: impl Into<String>,
        declared: FieldType,
        target: Option<Arc<Model>>,
    ) -> Result<Self> {
        let name = name.into();
        if let FieldType::Optional(inner) = &declared {
            if inner.is_optional() {
                return Err(Error::UnsupportedKind {
                    field: name,
                    kind: declared.to_string(),
                });
            }
        }
        let storage = DataType::for_kind(&name, declared.unwrapped())?;
        if let Some(wanted) = declared.reference_target() {
            match &target {
                Some(model) if model.name() == wanted => {}
                _ => {
                    return Err(Error::UnknownReference {
                        field: name,
                        target: wanted.to_string(),
                    })
                }
            }
        }
        let target = if declared.reference_target().is_some() {
            target
        } else {
            None
        };
        Ok(Self {
            name,
            declared,
            storage,
            target,
        })
    }

    pub(crate) fn identity() -> Self {
        Self {
            name: IDENTITY_FIELD.to_string(),
            declared: FieldType::Integer,
            storage: DataType::Integer,
            target: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared(&self) -> &FieldType {
        &self.declared
    }

    /// Column type after unwrapping `Optional` and resolving references to integer.
    pub fn storage_type(&self) -> DataType {
        self.storage
    }

    pub fn effective_kind(&self) -> &FieldType {
        self.declared.unwrapped()
    }

    pub fn is_nullable(&self) -> bool {
        self.declared.is_optional()
    }

    pub fn is_reference(&self) -> bool {
        self.target.is_some()
    }

    /// The referenced record type, for reference fields.
    pub fn target(&self) -> Option<&Arc<Model>> {
        self.target.as_ref()
    }

    /// Reject values a field can never persist. Only reference-ness is
    /// checked here; everything else is left to the engine.
    pub fn check_assignment(&self, value: &Value) -> Result<()> {
        match (&self.target, value) {
            (Some(_), Value::Integer(_) | Value::Null) => Ok(()),
            (Some(target), Value::Record(record)) if record.model().name() == target.name() => {
                Ok(())
            }
            (None, Value::Record(_)) | (Some(_), _) => Err(self.coercion_error(value)),
            (None, _) => Ok(()),
        }
    }

    /// Reduce a slot value to something SQLite can bind. A record in a
    /// reference field becomes its id; a bare integer id passes through.
    pub fn coerce_for_storage(&self, value: &Value) -> Result<Value> {
        self.check_assignment(value)?;
        match value {
            Value::Record(record) => match record.id() {
                Some(id) => Ok(Value::Integer(id)),
                None => Err(Error::UnsavedReference {
                    field: self.name.clone(),
                    target: record.model().name().to_string(),
                }),
            },
            other => Ok(other.clone()),
        }
    }

    /// Turn a column value back into the field's declared shape.
    pub fn coerce_from_storage(&self, value: Value) -> Value {
        match (self.effective_kind(), value) {
            (FieldType::Boolean, Value::Integer(v)) => Value::Boolean(v != 0),
            (_, value) => value,
        }
    }

    fn coercion_error(&self, value: &Value) -> Error {
        let found = match value {
            Value::Record(record) => format!("a `{}` record", record.model().name()),
            other => format!("a {} value", other.kind_name()),
        };
        let expected = match &self.target {
            Some(target) => format!("a `{}` record or an integer id", target.name()),
            None => format!("a {} value", self.effective_kind()),
        };
        Error::Coercion {
            field: self.name.clone(),
            expected,
            found,
        }
    }
}
