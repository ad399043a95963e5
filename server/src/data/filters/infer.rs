//! Operand type resolution
//!
//! A declared type wins when the operand parses under it. Otherwise the type
//! is inferred, first match wins:
//! 1. fully numeric and free of `-` → number
//! 2. exactly `true` / `false` → boolean
//! 3. `dateRange` operator, or parses as a date → date
//! 4. anything else → string
//!
//! The hyphen rule keeps ISO dates and negative-looking codes out of the
//! numeric branch; numeric-looking date fragments such as `2024` still infer
//! as numbers.

use crate::data::types::{FieldValue, parse_boolean, parse_date, parse_number};

use super::types::{FilterCondition, FilterOperator, ValueType};

/// Infer the operand type from its text and the operator
pub fn infer_type(value: &str, operator: &FilterOperator) -> ValueType {
    if !value.contains('-') && parse_number(value).is_some() {
        return ValueType::Number;
    }
    if parse_boolean(value).is_some() {
        return ValueType::Boolean;
    }
    if *operator == FilterOperator::DateRange || parse_date(value).is_some() {
        return ValueType::Date;
    }
    ValueType::String
}

/// Resolve a condition's operand to a typed value
pub fn resolve_value(condition: &FilterCondition) -> FieldValue {
    if let Some(declared) = condition.declared_type
        && let Some(value) = coerce(&condition.value, declared)
    {
        return value;
    }
    if let Some(declared) = condition.declared_type {
        tracing::debug!(
            column = %condition.column,
            declared = ?declared,
            value = %condition.value,
            "Operand does not parse as declared type, inferring"
        );
    }

    let inferred = infer_type(&condition.value, &condition.operator);
    coerce(&condition.value, inferred)
        .unwrap_or_else(|| FieldValue::Text(condition.value.clone()))
}

fn coerce(value: &str, value_type: ValueType) -> Option<FieldValue> {
    match value_type {
        ValueType::String => Some(FieldValue::Text(value.to_string())),
        ValueType::Number => parse_number(value).map(FieldValue::Number),
        ValueType::Boolean => parse_boolean(value).map(FieldValue::Boolean),
        ValueType::Date => parse_date(value).map(FieldValue::Date),
    }
}
