//! Filter parsing
//!
//! Parses a JSON filter array into conditions with size, count and column
//! validation. The lenient variant degrades to "no filters" so a malformed
//! filter never fails a search.

use thiserror::Error;

use crate::data::types::RecordKind;

use super::types::FilterCondition;

/// Default maximum size of filter JSON in bytes (64KB)
pub const DEFAULT_MAX_JSON_BYTES: usize = 64 * 1024;

/// Default maximum number of conditions allowed
pub const DEFAULT_MAX_CONDITIONS: usize = 50;

/// Limits applied while parsing filter JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterLimits {
    pub max_json_bytes: usize,
    pub max_conditions: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_json_bytes: DEFAULT_MAX_JSON_BYTES,
            max_conditions: DEFAULT_MAX_CONDITIONS,
        }
    }
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Filter JSON exceeds maximum size of {max} bytes ({size} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid filter JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Maximum {max} filter conditions allowed, got {count}")]
    TooMany { count: usize, max: usize },

    #[error("Cannot filter {kind} records by column: {column}")]
    InvalidColumn { kind: RecordKind, column: String },
}

impl FilterError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::TooLarge { .. } => "FILTER_JSON_TOO_LARGE",
            FilterError::InvalidJson(_) => "INVALID_FILTER_JSON",
            FilterError::TooMany { .. } => "TOO_MANY_FILTERS",
            FilterError::InvalidColumn { .. } => "INVALID_FILTER_COLUMN",
        }
    }
}

/// Parse filter conditions from a JSON string
///
/// Validates JSON size, parses into conditions, and validates every column
/// against the record kind's fields.
pub fn parse_filters(
    json_str: &str,
    kind: RecordKind,
    limits: &FilterLimits,
) -> Result<Vec<FilterCondition>, FilterError> {
    if json_str.len() > limits.max_json_bytes {
        return Err(FilterError::TooLarge {
            size: json_str.len(),
            max: limits.max_json_bytes,
        });
    }

    let trimmed = json_str.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let conditions: Vec<FilterCondition> = serde_json::from_str(trimmed)?;

    if conditions.len() > limits.max_conditions {
        return Err(FilterError::TooMany {
            count: conditions.len(),
            max: limits.max_conditions,
        });
    }

    for condition in &conditions {
        if kind.field(&condition.column).is_none() {
            return Err(FilterError::InvalidColumn {
                kind,
                column: condition.column.clone(),
            });
        }
    }

    Ok(conditions)
}

/// Parse filter conditions, logging and discarding malformed input
pub fn parse_filters_lenient(
    json_str: &str,
    kind: RecordKind,
    limits: &FilterLimits,
) -> Vec<FilterCondition> {
    match parse_filters(json_str, kind, limits) {
        Ok(conditions) => conditions,
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, %kind, "Ignoring malformed filters");
            Vec::new()
        }
    }
}
