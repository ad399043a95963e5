//! Typed field values
//!
//! Filters, records and storage all speak `FieldValue`, a closed tagged union
//! in place of untyped property bags keyed by column name.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Storage and display format for date fields
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest magnitude at which an `f64` still holds every integer exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Declared semantic type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Boolean,
}

impl FieldKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Boolean(bool),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Kind of the value, `None` for null
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Number(_) => Some(FieldKind::Number),
            FieldValue::Date(_) => Some(FieldKind::Date),
            FieldValue::Boolean(_) => Some(FieldKind::Boolean),
        }
    }

    /// Textual form used by text operators and case-insensitive comparison
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
        }
    }

    /// Integral numbers within the exact range, for binding as integers
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Number(n) => match self.as_integer() {
                Some(i) => JsonValue::from(i),
                None => serde_json::Number::from_f64(*n)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null),
            },
            FieldValue::Date(d) => JsonValue::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
        }
    }

    /// Convert a JSON value into a value of the given kind
    ///
    /// Returns `None` when the JSON cannot represent that kind.
    pub fn from_json(kind: FieldKind, value: &JsonValue) -> Option<Self> {
        if value.is_null() {
            return Some(FieldValue::Null);
        }
        match kind {
            FieldKind::Text => match value {
                JsonValue::String(s) => Some(FieldValue::Text(s.clone())),
                JsonValue::Number(n) => Some(FieldValue::Text(n.to_string())),
                _ => None,
            },
            FieldKind::Number => match value {
                JsonValue::Number(n) => n.as_f64().map(FieldValue::Number),
                JsonValue::String(s) => parse_number(s).map(FieldValue::Number),
                _ => None,
            },
            FieldKind::Date => value
                .as_str()
                .and_then(parse_date)
                .map(FieldValue::Date),
            FieldKind::Boolean => match value {
                JsonValue::Bool(b) => Some(FieldValue::Boolean(*b)),
                JsonValue::String(s) => parse_boolean(s).map(FieldValue::Boolean),
                JsonValue::Number(n) => match n.as_i64() {
                    Some(0) => Some(FieldValue::Boolean(false)),
                    Some(1) => Some(FieldValue::Boolean(true)),
                    _ => None,
                },
                _ => None,
            },
        }
    }

    /// Ordering between a stored value and an operand
    ///
    /// Text is coerced toward the other side's numeric or date form when it
    /// parses as one. Null and incomparable kinds yield `None`.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::*;
        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Number(a), Number(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(a.as_str().cmp(b.as_str())),
            (Text(a), Number(b)) => parse_number(a).and_then(|a| a.partial_cmp(b)),
            (Number(a), Text(b)) => parse_number(b).and_then(|b| a.partial_cmp(&b)),
            (Text(a), Date(b)) => parse_date(a).map(|a| a.cmp(b)),
            (Date(a), Text(b)) => parse_date(b).map(|b| a.cmp(&b)),
            _ => None,
        }
    }

    /// Exact equality with cross-kind coercion, `None` when either side is null
    pub fn exact_eq(&self, other: &FieldValue) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match self.compare(other) {
            Some(ordering) => Some(ordering == Ordering::Equal),
            None => Some(self.to_text() == other.to_text()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Text(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other.to_text().unwrap_or_default()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Parse a string that is fully a finite number (surrounding whitespace allowed)
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse the exact literals `true` and `false`
pub fn parse_boolean(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse an ISO-8601 style date or timestamp, keeping the calendar date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local().date());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(trimmed, "%Y/%m/%d").ok())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
