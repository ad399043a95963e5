//! Coach search filters
//!
//! User-authored condition lists compile to a `Predicate` that can be
//! evaluated in memory against typed records or rendered to a SQL WHERE
//! clause through a `SqlDialect`.
//!
//! ## Usage
//!
//! ```no_run
//! use coachyard_server::data::filters::{FilterLimits, SqlParams, compile_for, parse_filters};
//! use coachyard_server::data::sql::SqliteDialect;
//! use coachyard_server::data::types::RecordKind;
//!
//! let json_str = r#"[{"column": "pohby", "operator": "equals", "value": "PL"}]"#;
//! let conditions = parse_filters(json_str, RecordKind::Master, &FilterLimits::default()).unwrap();
//! let compiled = compile_for(RecordKind::Master, &conditions);
//! let mut params = SqlParams::default();
//! let sql = compiled.predicate.to_sql(&SqliteDialect, &mut params);
//! ```

mod compiler;
mod infer;
mod parser;
mod predicate;
mod sql;
mod types;

pub use compiler::{CompiledFilter, compile, compile_for, compile_lenient, compile_one};
pub use infer::{infer_type, resolve_value};
pub use parser::{
    DEFAULT_MAX_CONDITIONS, DEFAULT_MAX_JSON_BYTES, FilterError, FilterLimits, parse_filters,
    parse_filters_lenient,
};
pub use predicate::{Clause, Comparison, NoopReason, Predicate};
pub use sql::SqlParams;
pub use types::{FilterCondition, FilterOperator, LogicalOperator, ValueType};
