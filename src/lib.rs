//! Schema-mapped records over SQLite for the Runar ecosystem.
//!
//! # Intention
//!
//! - Declare a record type once and get its table, its statements and
//!   row-to-record hydration derived from the declaration.
//! - Keep persistence to the basics: save, find by one field, delete, scan.
//! - Persist references between record types as integer foreign keys.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No query composition beyond single-field equality, no joins, no
//!   migrations, no multi-statement transactions, no pooling.
//! - Engine errors (constraints, contention) are surfaced, never retried.
//!
//! # Example
//!
//! ```
//! use sqlite_orm::{Database, FieldType, ModelDef, Registry};
//!
//! # fn main() -> sqlite_orm::Result<()> {
//! let db = Database::open_in_memory()?;
//! let mut registry = Registry::new();
//! let person = registry.register(
//!     ModelDef::new("Person")
//!         .field("name", FieldType::Text)
//!         .field("age", FieldType::optional(FieldType::Integer)),
//! )?;
//! registry.create_tables(&db, false)?;
//!
//! let mut alice = person.new_record().with("name", "Alice")?;
//! let id = alice.save(&db)?;
//! let found = person.find(&db, id)?;
//! assert_eq!(found.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;
pub mod statement;
pub mod types;
pub mod value;

pub use connection::{Database, DatabaseConfig, Row, Rows};
pub use error::{Error, Result};
pub use field::FieldDescriptor;
pub use record::{Record, RecordState, Records};
pub use schema::{table_name, Model, ModelDef, Registry};
pub use statement::Statements;
pub use types::{DataType, FieldType};
pub use value::Value;
