//! Shared data types
//!
//! Typed values and records used by the filter compiler, the in-memory
//! evaluator and the SQLite repositories, plus audit log rows.

mod audit;
mod record;
mod value;

pub use audit::{AuditLogQuery, AuditLogRow, NewAuditLog};
pub use record::{
    FieldSpec, IDENTITY_FIELD, Record, RecordError, RecordKind, check_value, records_to_json,
};
pub use value::{
    DATE_FORMAT, FieldKind, FieldValue, parse_boolean, parse_date, parse_number,
};
