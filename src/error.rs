use rusqlite::ErrorCode;
use thiserror::Error;

use crate::record::RecordState;

#[derive(Error, Debug)]
pub enum Error {
    /// Raised by SQLite and passed through untouched (constraints, contention, I/O).
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("unsupported kind for field `{field}`: {kind}")]
    UnsupportedKind { field: String, kind: String },
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),
    #[error("field `{field}` is declared twice on `{model}`")]
    DuplicateField { model: String, field: String },
    #[error("field name `id` is reserved for the identity of `{model}`")]
    ReservedField { model: String },
    #[error("table `{table}` already belongs to `{existing}`")]
    DuplicateTable { table: String, existing: String },
    #[error("field `{field}` references `{target}`, which is not a registered record type")]
    UnknownReference { field: String, target: String },
    #[error("`{model}` has no field `{field}`")]
    UnknownField { model: String, field: String },
    #[error("field `{field}` of `{model}` is not a reference")]
    NotAReference { model: String, field: String },
    #[error("no row in `{table}` matches on `{field}`")]
    NotFound { table: String, field: String },
    #[error("field `{field}` expects {expected}, got {found}")]
    Coercion {
        field: String,
        expected: String,
        found: String,
    },
    #[error("field `{field}` refers to a `{target}` record that has not been saved")]
    UnsavedReference { field: String, target: String },
    #[error("cannot {operation} a {state} `{model}` record")]
    InvalidState {
        model: String,
        operation: &'static str,
        state: RecordState,
    },
}

impl Error {
    /// NOT NULL, FOREIGN KEY, UNIQUE or CHECK failure reported by the engine.
    pub fn is_constraint_violation(&self) -> bool {
        self.sqlite_code() == Some(ErrorCode::ConstraintViolation)
    }

    /// Lock contention that outlived the busy timeout.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.sqlite_code(),
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
        )
    }

    fn sqlite_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Storage(err) => err.sqlite_error_code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
