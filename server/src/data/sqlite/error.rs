//! SQLite error types

use thiserror::Error;

use crate::data::types::{RecordError, RecordKind};

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    Record(#[from] RecordError),

    #[error("Unknown column '{column}' for {kind} records")]
    UnknownColumn { kind: RecordKind, column: String },

    #[error("Column '{column}' of {kind} records cannot be updated")]
    ReadOnlyColumn { kind: RecordKind, column: String },
}
