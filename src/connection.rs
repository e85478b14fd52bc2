use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::value::Value;

/// Environment variable holding the database file path.
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const DEFAULT_DATABASE_PATH: &str = "db.db";

/// Applied verbatim, in order, once per connection.
pub const PRAGMAS: [&str; 6] = [
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
    "PRAGMA synchronous = NORMAL;",
    "PRAGMA cache_size = 1000000000;",
    "PRAGMA foreign_keys = true;",
    "PRAGMA temp_store = memory;",
];

/// SQLite database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the path from `DATABASE_PATH`, falling back to `db.db`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(DATABASE_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(default_path())
    }
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

/// One open, configured connection. Every statement runs through it and
/// commits on its own.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        info!(path = %config.path.display(), "opening database");
        let conn = Connection::open(&config.path)?;
        Self::configure(conn, Some(config.path.clone()))
    }

    pub fn open_in_memory() -> Result<Self> {
        info!("opening in-memory database");
        Self::configure(Connection::open_in_memory()?, None)
    }

    fn configure(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        for pragma in PRAGMAS {
            // Some pragmas answer with a row, so step instead of execute.
            let mut stmt = conn.prepare(pragma)?;
            let mut rows = stmt.query([])?;
            rows.next()?;
        }
        Ok(Self { conn, path })
    }

    /// `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The underlying rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run a statement and return the last inserted rowid. The value only
    /// means something after an insert.
    pub fn execute(&self, statement: &str, values: &[Value]) -> Result<i64> {
        debug!(statement, params = values.len(), "execute");
        self.conn.execute(statement, params_from_iter(values.iter()))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Run a query to completion and hand back its rows for a single pass.
    pub fn query(&self, statement: &str, values: &[Value]) -> Result<Rows> {
        debug!(statement, params = values.len(), "query");
        let mut stmt = self.conn.prepare(statement)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut buffered = Vec::new();
        while let Some(row) = rows.next()? {
            let mut row_values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                row_values.push(row.get::<_, Value>(i)?);
            }
            buffered.push(Row {
                columns: columns.clone(),
                values: row_values,
            });
        }
        Ok(Rows {
            inner: buffered.into_iter(),
        })
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err)?;
        info!("closed database");
        Ok(())
    }
}

/// One result row, addressable by column name
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column/value pairs in column order.
    pub fn into_values(self) -> impl Iterator<Item = (String, Value)> {
        self.columns.into_iter().zip(self.values)
    }
}

/// Forward-only, single-pass sequence of rows
#[derive(Debug)]
pub struct Rows {
    inner: std::vec::IntoIter<Row>,
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
