use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::connection::{Database, Row, Rows};
use crate::error::{Error, Result};
use crate::field::IDENTITY_FIELD;
use crate::schema::Model;
use crate::statement::Statements;
use crate::value::Value;

/// Where a record stands relative to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No identity yet; `save` inserts.
    Unsaved,
    /// Identity assigned; `save` updates.
    Saved,
    /// Row removed. Terminal.
    Deleted,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Unsaved => write!(f, "unsaved"),
            RecordState::Saved => write!(f, "saved"),
            RecordState::Deleted => write!(f, "deleted"),
        }
    }
}

/// An in-memory record of some registered type.
///
/// Values live in a name -> value map that always holds the identity under
/// `id`. A reference field holds either the bare id or a live [`Record`] of
/// the target type; nothing is fetched on assignment, use [`Record::fetch`].
#[derive(Debug, Clone)]
pub struct Record {
    model: Arc<Model>,
    values: HashMap<String, Value>,
    state: RecordState,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name() && self.values == other.values
    }
}

impl Record {
    pub fn new(model: &Arc<Model>) -> Self {
        let mut values = HashMap::with_capacity(model.fields().len() + 1);
        values.insert(IDENTITY_FIELD.to_string(), Value::Null);
        Self {
            model: Arc::clone(model),
            values,
            state: RecordState::Unsaved,
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Assign a field. Reference fields only take an integer id, null, or a
    /// record of the referenced type.
    ///
    /// Setting `id` directly makes the record claim an existing row, so the
    /// next `save` updates it; setting it to null turns it back into an
    /// unsaved record.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if field == IDENTITY_FIELD {
            return self.set_identity(value);
        }
        let descriptor = self
            .model
            .field(field)
            .ok_or_else(|| self.model.unknown_field(field))?;
        descriptor.check_assignment(&value)?;
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    fn set_identity(&mut self, value: Value) -> Result<()> {
        if self.state == RecordState::Deleted {
            return Err(self.invalid_state("re-identify"));
        }
        self.state = match &value {
            Value::Integer(_) => RecordState::Saved,
            Value::Null => RecordState::Unsaved,
            other => {
                return Err(Error::Coercion {
                    field: IDENTITY_FIELD.to_string(),
                    expected: "an integer id".to_string(),
                    found: format!("a {} value", other.kind_name()),
                })
            }
        };
        self.values.insert(IDENTITY_FIELD.to_string(), value);
        Ok(())
    }

    /// Current value of a field, `None` when it was never set.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn id(&self) -> Option<i64> {
        self.values.get(IDENTITY_FIELD).and_then(Value::as_i64)
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Insert when unsaved, update when saved. Returns the identity.
    pub fn save(&mut self, db: &Database) -> Result<i64> {
        match (self.state, self.id()) {
            (RecordState::Unsaved, _) => {
                let values = self.storage_values()?;
                let id = db.execute(self.model.statements().insert(), &values)?;
                self.values
                    .insert(IDENTITY_FIELD.to_string(), Value::Integer(id));
                self.state = RecordState::Saved;
                debug!(table = %self.model.table(), id, "inserted record");
                Ok(id)
            }
            (RecordState::Saved, Some(id)) => {
                if let Some(update) = self.model.statements().update() {
                    let mut values = self.storage_values()?;
                    values.push(Value::Integer(id));
                    db.execute(update, &values)?;
                    debug!(table = %self.model.table(), id, "updated record");
                }
                Ok(id)
            }
            _ => Err(self.invalid_state("save")),
        }
    }

    /// Remove the row. The record stays in memory but can no longer be saved.
    pub fn delete(&mut self, db: &Database) -> Result<()> {
        let id = match (self.state, self.id()) {
            (RecordState::Saved, Some(id)) => id,
            _ => return Err(self.invalid_state("delete")),
        };
        self.model.delete_by(db, IDENTITY_FIELD, id)?;
        self.state = RecordState::Deleted;
        debug!(table = %self.model.table(), id, "deleted record");
        Ok(())
    }

    /// Load the record a reference field points at. `Ok(None)` when the
    /// field is unset or null.
    pub fn fetch(&self, db: &Database, field: &str) -> Result<Option<Record>> {
        let descriptor = self
            .model
            .field(field)
            .ok_or_else(|| self.model.unknown_field(field))?;
        let target = descriptor.target().ok_or_else(|| Error::NotAReference {
            model: self.model.name().to_string(),
            field: field.to_string(),
        })?;
        match self.values.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match descriptor.coerce_for_storage(value)? {
                Value::Integer(id) => target.find(db, id).map(Some),
                _ => Ok(None),
            },
        }
    }

    /// Bindable values for the declared fields, in declaration order.
    fn storage_values(&self) -> Result<Vec<Value>> {
        self.model
            .fields()
            .iter()
            .map(|field| match self.values.get(field.name()) {
                Some(value) => field.coerce_for_storage(value),
                None => Ok(Value::Null),
            })
            .collect()
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            model: self.model.name().to_string(),
            operation,
            state: self.state,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} id=", self.model.name())?;
        match self.id() {
            Some(id) => write!(f, "{}", id)?,
            None => write!(f, "NULL")?,
        }
        for field in self.model.fields() {
            match self.values.get(field.name()) {
                Some(value) => write!(f, " {}={}", field.name(), value)?,
                None => write!(f, " {}=NULL", field.name())?,
            }
        }
        write!(f, ">")
    }
}

impl Model {
    pub fn new_record(self: &Arc<Self>) -> Record {
        Record::new(self)
    }

    /// Build a saved record from a row of this model's table.
    pub fn hydrate(self: &Arc<Self>, row: Row) -> Result<Record> {
        let mut record = Record::new(self);
        for (column, value) in row.into_values() {
            let field = self
                .field(&column)
                .ok_or_else(|| self.unknown_field(&column))?;
            let value = field.coerce_from_storage(value);
            record.values.insert(column, value);
        }
        if record.id().is_some() {
            record.state = RecordState::Saved;
        }
        Ok(record)
    }

    pub fn find(self: &Arc<Self>, db: &Database, id: i64) -> Result<Record> {
        self.find_by(db, IDENTITY_FIELD, id)
    }

    /// First record whose `field` equals `value`. No match is an error.
    pub fn find_by(
        self: &Arc<Self>,
        db: &Database,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Record> {
        let (statement, value) = self.lookup(field, value.into(), |s| s.find_by(field))?;
        let row = db
            .query(statement, &[value])?
            .next()
            .ok_or_else(|| Error::NotFound {
                table: self.table().to_string(),
                field: field.to_string(),
            })?;
        self.hydrate(row)
    }

    /// Delete every row whose `field` equals `value`.
    pub fn delete_by(&self, db: &Database, field: &str, value: impl Into<Value>) -> Result<()> {
        let (statement, value) = self.lookup(field, value.into(), |s| s.delete_by(field))?;
        db.execute(statement, &[value])?;
        Ok(())
    }

    /// Every row of the table, hydrated as the iterator advances.
    pub fn all(self: &Arc<Self>, db: &Database) -> Result<Records> {
        let rows = db.query(self.statements().select_all(), &[])?;
        Ok(Records {
            model: Arc::clone(self),
            rows,
        })
    }

    fn lookup<'a>(
        &'a self,
        field: &str,
        value: Value,
        statement: impl FnOnce(&'a Statements) -> Option<&'a str>,
    ) -> Result<(&'a str, Value)> {
        let descriptor = self.field(field).ok_or_else(|| self.unknown_field(field))?;
        let statement = statement(self.statements()).ok_or_else(|| self.unknown_field(field))?;
        Ok((statement, descriptor.coerce_for_storage(&value)?))
    }
}

/// Records hydrated one row at a time from a finished query
#[derive(Debug)]
pub struct Records {
    model: Arc<Model>,
    rows: Rows,
}

impl Iterator for Records {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| self.model.hydrate(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
