//! Data storage layer
//!
//! - `types` - Typed field values, coach records and audit rows
//! - `filters` - Filter parsing, compilation, evaluation and SQL rendering
//! - `sql` - SQL dialects the filter renderer targets
//! - `sqlite` - Embedded store for coach records and the audit log
//! - `error` - Unified error type for the data layer

pub mod error;
pub mod filters;
pub mod sql;
pub mod sqlite;
pub mod types;

pub use error::DataError;
pub use sqlite::SqliteService;
