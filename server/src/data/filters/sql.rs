//! SQL rendering for compiled predicates
//!
//! Produces a WHERE clause fragment with dialect placeholders and collects
//! the bound values in placeholder order. Column names are interpolated, so
//! callers must only render predicates whose columns were validated against
//! the record kind's field table.

use crate::data::sql::SqlDialect;
use crate::data::types::FieldValue;
use crate::utils::sql::escape_like_pattern;

use super::predicate::{Clause, Comparison, Predicate};

/// Collects SQL parameters during query building (maintains insertion order)
#[derive(Debug, Default)]
pub struct SqlParams {
    pub values: Vec<FieldValue>,
}

impl SqlParams {
    /// Add a value and return its placeholder
    pub fn push(&mut self, dialect: &dyn SqlDialect, value: FieldValue) -> String {
        self.values.push(value);
        dialect.placeholder(self.values.len())
    }

    fn push_operand(&mut self, dialect: &dyn SqlDialect, value: &FieldValue) -> String {
        let placeholder = self.push(dialect, value.clone());
        match value {
            FieldValue::Date(_) => dialect.date_param(&placeholder),
            _ => placeholder,
        }
    }
}

impl Predicate {
    /// Generate SQL WHERE clause fragment
    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        self.to_sql_aliased(dialect, params, |col| col, "")
    }

    /// Generate SQL WHERE clause fragment with column name mapping and table alias
    ///
    /// The alias is prepended to column names (e.g., "cm" → "cm.pohby").
    /// Pass empty string for no alias.
    pub fn to_sql_aliased<F>(
        &self,
        dialect: &dyn SqlDialect,
        params: &mut SqlParams,
        mapper: F,
        alias: &str,
    ) -> String
    where
        F: Fn(&str) -> &str + Copy,
    {
        match self {
            Self::MatchAll | Self::Noop(_) => "1=1".to_string(),
            Self::Clause(clause) => clause_sql(clause, dialect, params, mapper, alias),
            Self::Not(inner) => format!(
                "NOT ({})",
                inner.to_sql_aliased(dialect, params, mapper, alias)
            ),
            Self::And(predicates) => {
                group_sql(predicates, " AND ", "1=1", dialect, params, mapper, alias)
            }
            Self::Or(predicates) => {
                group_sql(predicates, " OR ", "1=0", dialect, params, mapper, alias)
            }
        }
    }
}

fn group_sql<F>(
    predicates: &[Predicate],
    joiner: &str,
    empty: &str,
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
    mapper: F,
    alias: &str,
) -> String
where
    F: Fn(&str) -> &str + Copy,
{
    if predicates.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = predicates
        .iter()
        .map(|p| p.to_sql_aliased(dialect, params, mapper, alias))
        .collect();
    format!("({})", parts.join(joiner))
}

fn clause_sql<F>(
    clause: &Clause,
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
    mapper: F,
    alias: &str,
) -> String
where
    F: Fn(&str) -> &str,
{
    let mapped = mapper(&clause.column);
    let col = if alias.is_empty() {
        mapped.to_string()
    } else {
        format!("{}.{}", alias, mapped)
    };

    match &clause.comparison {
        Comparison::IsNull => format!("{} IS NULL", col),
        Comparison::Equals {
            value,
            case_insensitive: true,
        } => {
            let ph = params.push(dialect, value.clone());
            dialect.equals_ignore_case(&col, &ph)
        }
        Comparison::Equals { value, .. } => binary(&col, "=", value, dialect, params),
        Comparison::Contains(s) => {
            let ph = params.push(
                dialect,
                FieldValue::Text(format!("%{}%", escape_like_pattern(s))),
            );
            dialect.ilike(&col, &ph)
        }
        Comparison::StartsWith(s) => {
            let ph = params.push(
                dialect,
                FieldValue::Text(format!("{}%", escape_like_pattern(s))),
            );
            dialect.ilike(&col, &ph)
        }
        Comparison::EndsWith(s) => {
            let ph = params.push(
                dialect,
                FieldValue::Text(format!("%{}", escape_like_pattern(s))),
            );
            dialect.ilike(&col, &ph)
        }
        Comparison::GreaterThan(v) => binary(&col, ">", v, dialect, params),
        Comparison::GreaterThanOrEqual(v) => binary(&col, ">=", v, dialect, params),
        Comparison::LessThan(v) => binary(&col, "<", v, dialect, params),
        Comparison::LessThanOrEqual(v) => binary(&col, "<=", v, dialect, params),
        Comparison::Between { from, to } => {
            let lo = params.push_operand(dialect, from);
            let hi = params.push_operand(dialect, to);
            format!("{} BETWEEN {} AND {}", col, lo, hi)
        }
    }
}

fn binary(
    col: &str,
    op: &str,
    value: &FieldValue,
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
) -> String {
    let ph = params.push_operand(dialect, value);
    format!("{} {} {}", col, op, ph)
}
