use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::connection::Database;
use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, IDENTITY_FIELD};
use crate::statement::Statements;
use crate::types::FieldType;

/// Declaration of a record type: its name and fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub name: String,
    pub fields: Vec<(String, FieldType)>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields.push((name.into(), kind));
        self
    }
}

/// A registered record type: table name, field descriptors and the
/// statements derived from them.
#[derive(Debug)]
pub struct Model {
    name: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    identity: FieldDescriptor,
    statements: Statements,
}

impl Model {
    fn new(name: String, table: String, fields: Vec<FieldDescriptor>) -> Self {
        let statements = Statements::build(&table, &fields);
        Self {
            name,
            table,
            fields,
            identity: FieldDescriptor::identity(),
            statements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields, without the identity.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn identity(&self) -> &FieldDescriptor {
        &self.identity
    }

    /// Look a field up by name, identity included.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        if name == IDENTITY_FIELD {
            return Some(&self.identity);
        }
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    pub(crate) fn unknown_field(&self, field: &str) -> Error {
        Error::UnknownField {
            model: self.name.clone(),
            field: field.to_string(),
        }
    }

    pub fn create_table(&self, db: &Database, drop_existing: bool) -> Result<()> {
        if drop_existing {
            self.drop_table(db)?;
        }
        db.execute(self.statements.create(), &[])?;
        info!(table = %self.table, "created table");
        Ok(())
    }

    pub fn drop_table(&self, db: &Database) -> Result<()> {
        db.execute(self.statements.drop_table(), &[])?;
        info!(table = %self.table, "dropped table");
        Ok(())
    }
}

/// Holds every registered record type so references can be resolved by name.
#[derive(Debug, Default)]
pub struct Registry {
    models: HashMap<String, Arc<Model>>,
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a declaration and turn it into a model. Reference targets
    /// must already be registered.
    pub fn register(&mut self, def: ModelDef) -> Result<Arc<Model>> {
        validate_identifier(&def.name)?;
        let table = table_name(&def.name);
        if let Some(existing) = self
            .models
            .values()
            .find(|m| m.table() == table && m.name() != def.name)
        {
            return Err(Error::DuplicateTable {
                table,
                existing: existing.name().to_string(),
            });
        }
        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(def.fields.len());
        for (name, kind) in def.fields {
            validate_identifier(&name)?;
            if name == IDENTITY_FIELD {
                return Err(Error::ReservedField { model: def.name });
            }
            if fields.iter().any(|f| f.name() == name) {
                return Err(Error::DuplicateField {
                    model: def.name,
                    field: name,
                });
            }
            let target = match kind.reference_target() {
                Some(target) => match self.models.get(target) {
                    Some(model) => Some(Arc::clone(model)),
                    None => {
                        return Err(Error::UnknownReference {
                            field: name,
                            target: target.to_string(),
                        })
                    }
                },
                None => None,
            };
            fields.push(FieldDescriptor::new(name, kind, target)?);
        }

        let model = Arc::new(Model::new(def.name, table, fields));
        let previous = self
            .models
            .insert(model.name().to_string(), Arc::clone(&model));
        if previous.is_some() {
            warn!(model = %model.name(), "record type registered again, replacing");
        } else {
            self.order.push(model.name().to_string());
        }
        Ok(model)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered models in registration order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.order.iter().filter_map(|name| self.models.get(name))
    }

    /// Create every registered table. Referenced tables come first, and
    /// existing tables are dropped in reverse order when asked.
    pub fn create_tables(&self, db: &Database, drop_existing: bool) -> Result<()> {
        if drop_existing {
            let models: Vec<&Arc<Model>> = self.models().collect();
            for model in models.into_iter().rev() {
                model.drop_table(db)?;
            }
        }
        for model in self.models() {
            model.create_table(db, false)?;
        }
        Ok(())
    }
}

/// `BookAuthor` -> `book_author`
pub fn table_name(type_name: &str) -> String {
    let mut table = String::with_capacity(type_name.len() + 4);
    for c in type_name.chars() {
        if c.is_ascii_uppercase() {
            table.push('_');
            table.push(c.to_ascii_lowercase());
        } else {
            table.push(c);
        }
    }
    table.trim_start_matches('_').to_string()
}

fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}
