//! Compiled predicate tree and in-memory evaluation
//!
//! Evaluation follows SQL three-valued logic so that a predicate compiled with
//! `compile_for` selects the same records in memory as its rendered WHERE
//! clause does in SQLite: comparisons against a null field are unknown,
//! `NOT unknown` stays unknown, and AND/OR combine unknowns the Kleene way.
//!
//! Case folding is ASCII-only, as SQLite's `LOWER` and `LIKE` are. Postgres
//! `ILIKE` also folds non-ASCII letters, so accented text can match there and
//! not here.

use std::fmt;

use crate::data::types::{FieldValue, Record};

/// Why a condition compiled to a no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoopReason {
    UnknownOperator(String),
    /// `dateRange` without an upper bound
    MissingUpperBound,
    /// `dateRange` bound that is not a date
    InvalidDateBound,
}

/// Field-level comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    IsNull,
    Equals {
        value: FieldValue,
        case_insensitive: bool,
    },
    /// Case-insensitive substring match
    Contains(String),
    /// Case-insensitive prefix match
    StartsWith(String),
    /// Case-insensitive suffix match
    EndsWith(String),
    GreaterThan(FieldValue),
    GreaterThanOrEqual(FieldValue),
    LessThan(FieldValue),
    LessThanOrEqual(FieldValue),
    /// Inclusive on both ends
    Between {
        from: FieldValue,
        to: FieldValue,
    },
}

/// Comparison bound to a column
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub column: String,
    pub comparison: Comparison,
}

/// Compiled filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Empty condition list
    MatchAll,
    /// Degenerate condition that imposes no constraint
    Noop(NoopReason),
    Clause(Clause),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn clause(column: impl Into<String>, comparison: Comparison) -> Self {
        Self::Clause(Clause {
            column: column.into(),
            comparison,
        })
    }

    pub fn negate(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }

    /// Three-valued evaluation; `None` is SQL's unknown
    pub fn evaluate(&self, record: &Record) -> Option<bool> {
        match self {
            Self::MatchAll | Self::Noop(_) => Some(true),
            Self::Clause(clause) => clause.comparison.evaluate(record.get(&clause.column)),
            Self::Not(inner) => inner.evaluate(record).map(|b| !b),
            Self::And(predicates) => {
                let mut unknown = false;
                for predicate in predicates {
                    match predicate.evaluate(record) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown { None } else { Some(true) }
            }
            Self::Or(predicates) => {
                let mut unknown = false;
                for predicate in predicates {
                    match predicate.evaluate(record) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown { None } else { Some(false) }
            }
        }
    }

    /// Whether the record is selected
    pub fn matches(&self, record: &Record) -> bool {
        self.evaluate(record) == Some(true)
    }

    /// Columns referenced by clauses, in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::MatchAll | Self::Noop(_) => {}
            Self::Clause(clause) => {
                if !out.contains(&clause.column.as_str()) {
                    out.push(&clause.column);
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
            Self::And(predicates) | Self::Or(predicates) => {
                for predicate in predicates {
                    predicate.collect_columns(out);
                }
            }
        }
    }
}

impl Comparison {
    /// Comparisons made on the field's text form
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Contains(_)
                | Self::StartsWith(_)
                | Self::EndsWith(_)
                | Self::Equals {
                    case_insensitive: true,
                    ..
                }
        )
    }

    pub(crate) fn evaluate(&self, field: &FieldValue) -> Option<bool> {
        match self {
            Self::IsNull => Some(field.is_null()),
            _ if field.is_null() => None,
            Self::Equals {
                value,
                case_insensitive: true,
            } => Some(lowered(field)? == lowered(value)?),
            Self::Equals {
                value,
                case_insensitive: false,
            } => field.exact_eq(value),
            Self::Contains(needle) => {
                Some(lowered(field)?.contains(&needle.to_ascii_lowercase()))
            }
            Self::StartsWith(prefix) => {
                Some(lowered(field)?.starts_with(&prefix.to_ascii_lowercase()))
            }
            Self::EndsWith(suffix) => {
                Some(lowered(field)?.ends_with(&suffix.to_ascii_lowercase()))
            }
            Self::GreaterThan(value) => field.compare(value).map(|o| o.is_gt()),
            Self::GreaterThanOrEqual(value) => field.compare(value).map(|o| o.is_ge()),
            Self::LessThan(value) => field.compare(value).map(|o| o.is_lt()),
            Self::LessThanOrEqual(value) => field.compare(value).map(|o| o.is_le()),
            Self::Between { from, to } => {
                let lower = field.compare(from)?.is_ge();
                let upper = field.compare(to)?.is_le();
                Some(lower && upper)
            }
        }
    }
}

fn lowered(value: &FieldValue) -> Option<String> {
    value.to_text().map(|s| s.to_ascii_lowercase())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAll => write!(f, "ALL"),
            Self::Noop(reason) => write!(f, "NOOP({:?})", reason),
            Self::Clause(clause) => write!(f, "{}", clause),
            Self::Not(inner) => write!(f, "NOT({})", inner),
            Self::And(predicates) => write_group(f, "AND", predicates),
            Self::Or(predicates) => write_group(f, "OR", predicates),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, name: &str, predicates: &[Predicate]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", predicate)?;
    }
    write!(f, ")")
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col = &self.column;
        match &self.comparison {
            Comparison::IsNull => write!(f, "{} IS NULL", col),
            Comparison::Equals {
                value,
                case_insensitive: true,
            } => write!(f, "{} =~ {}", col, value),
            Comparison::Equals { value, .. } => write!(f, "{} = {}", col, value),
            Comparison::Contains(s) => write!(f, "{} CONTAINS '{}'", col, s),
            Comparison::StartsWith(s) => write!(f, "{} STARTS WITH '{}'", col, s),
            Comparison::EndsWith(s) => write!(f, "{} ENDS WITH '{}'", col, s),
            Comparison::GreaterThan(v) => write!(f, "{} > {}", col, v),
            Comparison::GreaterThanOrEqual(v) => write!(f, "{} >= {}", col, v),
            Comparison::LessThan(v) => write!(f, "{} < {}", col, v),
            Comparison::LessThanOrEqual(v) => write!(f, "{} <= {}", col, v),
            Comparison::Between { from, to } => write!(f, "{} BETWEEN {} AND {}", col, from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::RecordKind;
    use serde_json::json;

    fn coach(value: serde_json::Value) -> Record {
        Record::from_json(RecordKind::Master, &value).unwrap()
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn case_insensitive_equals() {
        let p = Predicate::clause(
            "pohby",
            Comparison::Equals {
                value: text("PL"),
                case_insensitive: true,
            },
        );
        assert!(p.matches(&coach(json!({"coachno": "1", "pohby": "pl"}))));
        assert!(!p.matches(&coach(json!({"coachno": "2", "pohby": "PLX"}))));
    }

    #[test]
    fn text_operators() {
        let record = coach(json!({"coachno": "1", "remarks": "Brake Block Replaced"}));
        let contains = Predicate::clause("remarks", Comparison::Contains("block".into()));
        let starts = Predicate::clause("remarks", Comparison::StartsWith("BRAKE".into()));
        let ends = Predicate::clause("remarks", Comparison::EndsWith("placed".into()));
        assert!(contains.matches(&record));
        assert!(starts.matches(&record));
        assert!(ends.matches(&record));
    }

    #[test]
    fn null_field_is_unknown_not_false() {
        let record = coach(json!({"coachno": "1"}));
        let eq = Predicate::clause(
            "pohby",
            Comparison::Equals {
                value: text("PL"),
                case_insensitive: true,
            },
        );
        assert_eq!(eq.evaluate(&record), None);
        assert_eq!(Predicate::negate(eq).evaluate(&record), None);

        let is_null = Predicate::clause("pohby", Comparison::IsNull);
        assert_eq!(is_null.evaluate(&record), Some(true));
        assert_eq!(Predicate::negate(is_null).evaluate(&record), Some(false));
    }

    #[test]
    fn kleene_groups() {
        let record = coach(json!({"coachno": "1", "built_year": 2001}));
        let unknown = Predicate::clause("pohby", Comparison::Contains("x".into()));
        let yes = Predicate::clause(
            "built_year",
            Comparison::GreaterThan(FieldValue::Number(2000.0)),
        );
        let no = Predicate::clause(
            "built_year",
            Comparison::LessThan(FieldValue::Number(2000.0)),
        );

        assert_eq!(
            Predicate::Or(vec![unknown.clone(), yes.clone()]).evaluate(&record),
            Some(true)
        );
        assert_eq!(
            Predicate::Or(vec![unknown.clone(), no.clone()]).evaluate(&record),
            None
        );
        assert_eq!(
            Predicate::And(vec![unknown.clone(), no]).evaluate(&record),
            Some(false)
        );
        assert_eq!(Predicate::And(vec![unknown, yes]).evaluate(&record), None);
    }

    #[test]
    fn between_is_inclusive() {
        let from = FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let to = FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let p = Predicate::clause("poh_date", Comparison::Between { from, to });

        assert!(p.matches(&coach(json!({"coachno": "1", "poh_date": "2024-01-01"}))));
        assert!(p.matches(&coach(json!({"coachno": "2", "poh_date": "2024-01-31"}))));
        assert!(!p.matches(&coach(json!({"coachno": "3", "poh_date": "2024-02-01"}))));
    }

    #[test]
    fn unconstrained_predicates_match_everything() {
        let record = coach(json!({"coachno": "1"}));
        assert!(Predicate::MatchAll.matches(&record));
        assert!(Predicate::Noop(NoopReason::MissingUpperBound).matches(&record));
    }

    #[test]
    fn case_folding_is_ascii_only() {
        let record = coach(json!({"coachno": "1", "base_depot": "ÉRODE Yard"}));
        let ascii = Predicate::clause("base_depot", Comparison::Contains("yard".into()));
        let accented = Predicate::clause("base_depot", Comparison::StartsWith("érode".into()));
        assert!(ascii.matches(&record));
        assert!(!accented.matches(&record));
    }

    #[test]
    fn textual_comparisons() {
        assert!(Comparison::Contains("x".into()).is_textual());
        assert!(
            Comparison::Equals {
                value: text("PL"),
                case_insensitive: true
            }
            .is_textual()
        );
        assert!(
            !Comparison::Equals {
                value: FieldValue::Boolean(true),
                case_insensitive: false
            }
            .is_textual()
        );
        assert!(!Comparison::IsNull.is_textual());
    }

    #[test]
    fn columns_are_deduplicated() {
        let p = Predicate::And(vec![
            Predicate::clause("pohby", Comparison::IsNull),
            Predicate::negate(Predicate::clause("remarks", Comparison::Contains("x".into()))),
            Predicate::clause("pohby", Comparison::StartsWith("P".into())),
            Predicate::MatchAll,
        ]);
        assert_eq!(p.columns(), vec!["pohby", "remarks"]);
    }

    #[test]
    fn display_is_readable() {
        let p = Predicate::Or(vec![
            Predicate::clause("pohby", Comparison::IsNull),
            Predicate::negate(Predicate::clause(
                "built_year",
                Comparison::Equals {
                    value: FieldValue::Number(1998.0),
                    case_insensitive: false,
                },
            )),
        ]);
        assert_eq!(p.to_string(), "OR(pohby IS NULL, NOT(built_year = 1998))");
    }
}
