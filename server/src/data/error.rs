//! Unified error type for data layer
//!
//! Wraps storage and record errors so services can return one type.

use thiserror::Error;

use crate::data::types::{RecordError, RecordKind};

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// Record failed field-table validation
    #[error("Invalid record: {0}")]
    Record(#[from] RecordError),

    /// Column outside the record kind's field table
    #[error("Unknown column '{column}' for {kind} records")]
    UnknownColumn { kind: RecordKind, column: String },

    /// Attempt to write a key column
    #[error("Column '{column}' of {kind} records cannot be updated")]
    ReadOnlyColumn { kind: RecordKind, column: String },
}

/// Convert from the SqliteError type
impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        use crate::data::sqlite::SqliteError;
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                backend: "sqlite",
                version,
                name,
                error,
            },
            SqliteError::Io(e) => Self::Io(e),
            SqliteError::Record(e) => Self::Record(e),
            SqliteError::UnknownColumn { kind, column } => Self::UnknownColumn { kind, column },
            SqliteError::ReadOnlyColumn { kind, column } => Self::ReadOnlyColumn { kind, column },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteError;

    #[test]
    fn test_from_sqlite_error_keeps_context() {
        let err: DataError = SqliteError::MigrationFailed {
            version: 3,
            name: "x".into(),
            error: "boom".into(),
        }
        .into();
        assert!(matches!(
            err,
            DataError::MigrationFailed {
                backend: "sqlite",
                version: 3,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Migration 3 (x) failed on sqlite: boom");

        let err: DataError = SqliteError::UnknownColumn {
            kind: RecordKind::Master,
            column: "colour".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Unknown column 'colour' for master records");
    }

    #[test]
    fn test_from_record_error() {
        let missing = RecordError::MissingIdentity(RecordKind::Master);
        let err: DataError = SqliteError::Record(missing).into();
        assert!(matches!(err, DataError::Record(_)));
    }
}
