//! SQLite repositories
//!
//! Types (Record, AuditLogRow, etc.) should be imported from `crate::data::types`.

pub mod audit_log;
pub mod coach;

pub use audit_log::{insert_audit_log, list_audit_logs};
pub use coach::{count_records, get_records, search_records, update_field, upsert_records};
