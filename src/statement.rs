use std::collections::HashMap;
use std::fmt;

use crate::field::{FieldDescriptor, IDENTITY_FIELD};
use crate::types::DataType;

/// Table definition rendered into a `CREATE TABLE` statement
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Identity column first, then one column per declared field.
    pub fn for_fields(table: &str, fields: &[FieldDescriptor]) -> Self {
        let mut columns = vec![ColumnDefinition {
            name: IDENTITY_FIELD.to_string(),
            data_type: DataType::Integer,
            constraints: vec![ColumnConstraint::PrimaryKey],
        }];
        columns.extend(fields.iter().map(ColumnDefinition::for_field));
        Self {
            name: table.to_string(),
            columns,
        }
    }
}

impl fmt::Display for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        write!(
            f,
            "CREATE TABLE {} ({})",
            quote(&self.name),
            columns.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDefinition {
    pub fn for_field(field: &FieldDescriptor) -> Self {
        let mut constraints = Vec::new();
        if !field.is_nullable() {
            constraints.push(ColumnConstraint::NotNull);
        }
        if let Some(target) = field.target() {
            constraints.push(ColumnConstraint::References {
                table: target.table().to_string(),
                column: IDENTITY_FIELD.to_string(),
            });
        }
        Self {
            name: field.name().to_string(),
            data_type: field.storage_type(),
            constraints,
        }
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote(&self.name), self.data_type)?;
        for constraint in &self.constraints {
            write!(f, " {}", constraint)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    References { table: String, column: String },
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnConstraint::PrimaryKey => write!(f, "PRIMARY KEY"),
            ColumnConstraint::NotNull => write!(f, "NOT NULL"),
            ColumnConstraint::References { table, column } => {
                write!(f, "REFERENCES {}({})", quote(table), quote(column))
            }
        }
    }
}

/// Statement text for one record type, rendered once at registration.
///
/// Identifiers come only from schema metadata and are always quoted, so
/// names like `order` or `group` are safe; every caller-supplied value is
/// bound through a numbered placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Statements {
    create: String,
    drop_table: String,
    insert: String,
    update: Option<String>,
    select_all: String,
    find_by: HashMap<String, String>,
    delete_by: HashMap<String, String>,
}

impl Statements {
    pub fn build(table: &str, fields: &[FieldDescriptor]) -> Self {
        let quoted_table = quote(table);
        let names: Vec<String> = fields.iter().map(|f| quote(f.name())).collect();

        let insert = if names.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quoted_table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quoted_table,
                names.join(", "),
                placeholders(names.len())
            )
        };

        let update = (!names.is_empty()).then(|| {
            let assignments: Vec<String> = names
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{} = ?{}", name, i + 1))
                .collect();
            format!(
                "UPDATE {} SET {} WHERE {} = ?{}",
                quoted_table,
                assignments.join(", "),
                quote(IDENTITY_FIELD),
                names.len() + 1
            )
        });

        let mut find_by = HashMap::new();
        let mut delete_by = HashMap::new();
        for name in std::iter::once(IDENTITY_FIELD).chain(fields.iter().map(|f| f.name())) {
            find_by.insert(
                name.to_string(),
                format!("SELECT * FROM {} WHERE {} = ?1", quoted_table, quote(name)),
            );
            delete_by.insert(
                name.to_string(),
                format!("DELETE FROM {} WHERE {} = ?1", quoted_table, quote(name)),
            );
        }

        Self {
            create: TableDefinition::for_fields(table, fields).to_string(),
            drop_table: format!("DROP TABLE IF EXISTS {}", quoted_table),
            insert,
            update,
            select_all: format!("SELECT * FROM {}", quoted_table),
            find_by,
            delete_by,
        }
    }

    pub fn create(&self) -> &str {
        &self.create
    }

    pub fn drop_table(&self) -> &str {
        &self.drop_table
    }

    pub fn insert(&self) -> &str {
        &self.insert
    }

    /// `None` for a record type with no declared fields.
    pub fn update(&self) -> Option<&str> {
        self.update.as_deref()
    }

    pub fn select_all(&self) -> &str {
        &self.select_all
    }

    pub fn find_by(&self, field: &str) -> Option<&str> {
        self.find_by.get(field).map(String::as_str)
    }

    pub fn delete_by(&self, field: &str) -> Option<&str> {
        self.delete_by.get(field).map(String::as_str)
    }
}

/// Double-quote an identifier. Names are validated at registration, so they
/// never contain a quote themselves.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
