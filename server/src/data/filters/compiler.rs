//! Filter compiler
//!
//! Turns an ordered list of conditions into a single predicate.
//!
//! Groups of two or more conditions are flat: if any condition after the
//! first is joined with `OR`, the whole group is one `OR` of every compiled
//! condition, otherwise one `AND`. There is no precedence, so `A AND B OR C`
//! compiles to `OR(A, B, C)` rather than `OR(AND(A, B), C)`. The connective
//! sequence is kept on `CompiledFilter` for a precedence-aware evaluator.
//!
//! `compile_for` also consults the record kind's field table so that the
//! rendered SQL and the in-memory evaluator agree on stored column types.

use crate::data::types::{FieldKind, FieldValue, Record, RecordKind, parse_date};

use super::infer::resolve_value;
use super::parser::{FilterLimits, parse_filters_lenient};
use super::predicate::{Comparison, NoopReason, Predicate};
use super::types::{FilterCondition, FilterOperator, LogicalOperator, ValueType};

/// Result of compiling a condition list
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub predicate: Predicate,
    /// Each condition's connective, in input order
    pub connectives: Vec<LogicalOperator>,
}

impl CompiledFilter {
    /// Top-level group operator, `None` for zero or one condition
    pub fn group_operator(&self) -> Option<LogicalOperator> {
        match self.predicate {
            Predicate::And(_) if self.connectives.len() > 1 => Some(LogicalOperator::And),
            Predicate::Or(_) if self.connectives.len() > 1 => Some(LogicalOperator::Or),
            _ => None,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicate.matches(record)
    }
}

/// Compile a condition list into a single flat predicate
///
/// Operands are typed from their text alone. Use `compile_for` when the
/// predicate will run against stored records.
pub fn compile(conditions: &[FilterCondition]) -> CompiledFilter {
    compile_with(conditions, compile_one)
}

/// Compile a condition list against a record kind's columns
///
/// Operands aimed at text columns stay text, so `coachno equals "04512"`
/// compares strings rather than the number 4512. Text operators on boolean
/// columns are resolved against the `true`/`false` spellings up front,
/// because storage holds booleans as integers.
pub fn compile_for(kind: RecordKind, conditions: &[FilterCondition]) -> CompiledFilter {
    compile_with(conditions, |condition| {
        match kind.field(&condition.column).map(|f| f.kind) {
            Some(FieldKind::Text) => {
                compile_one(&condition.clone().with_type(ValueType::String))
            }
            Some(FieldKind::Boolean) => spell_booleans(compile_one(condition)),
            _ => compile_one(condition),
        }
    })
}

/// Parse and compile a serialized search filter
///
/// Malformed input is logged and compiles to a match-all filter.
pub fn compile_lenient(
    json_str: &str,
    kind: RecordKind,
    limits: &FilterLimits,
) -> CompiledFilter {
    compile_for(kind, &parse_filters_lenient(json_str, kind, limits))
}

fn compile_with<F>(conditions: &[FilterCondition], compile_condition: F) -> CompiledFilter
where
    F: Fn(&FilterCondition) -> Predicate,
{
    let connectives = conditions.iter().map(|c| c.logical_operator).collect();

    let predicate = match conditions {
        [] => Predicate::MatchAll,
        [single] => compile_condition(single),
        [_, rest @ ..] => {
            let any_or = rest
                .iter()
                .any(|c| c.logical_operator == LogicalOperator::Or);
            let predicates = conditions.iter().map(&compile_condition).collect();
            if any_or {
                Predicate::Or(predicates)
            } else {
                Predicate::And(predicates)
            }
        }
    };

    tracing::debug!(
        conditions = conditions.len(),
        predicate = %predicate,
        "Compiled filter"
    );

    CompiledFilter {
        predicate,
        connectives,
    }
}

/// Compile a single condition
pub fn compile_one(condition: &FilterCondition) -> Predicate {
    let column = condition.column.as_str();

    match &condition.operator {
        FilterOperator::IsEmpty => Predicate::clause(column, Comparison::IsNull),
        FilterOperator::IsNotEmpty => {
            Predicate::negate(Predicate::clause(column, Comparison::IsNull))
        }
        FilterOperator::Equals => equals(column, resolve_value(condition)),
        FilterOperator::NotEquals => Predicate::negate(equals(column, resolve_value(condition))),
        FilterOperator::Contains => {
            Predicate::clause(column, Comparison::Contains(condition.value.clone()))
        }
        FilterOperator::NotContains => Predicate::negate(Predicate::clause(
            column,
            Comparison::Contains(condition.value.clone()),
        )),
        FilterOperator::StartsWith => {
            Predicate::clause(column, Comparison::StartsWith(condition.value.clone()))
        }
        FilterOperator::EndsWith => {
            Predicate::clause(column, Comparison::EndsWith(condition.value.clone()))
        }
        FilterOperator::GreaterThan => {
            Predicate::clause(column, Comparison::GreaterThan(resolve_value(condition)))
        }
        FilterOperator::GreaterThanOrEqual => Predicate::clause(
            column,
            Comparison::GreaterThanOrEqual(resolve_value(condition)),
        ),
        FilterOperator::LessThan => {
            Predicate::clause(column, Comparison::LessThan(resolve_value(condition)))
        }
        FilterOperator::LessThanOrEqual => Predicate::clause(
            column,
            Comparison::LessThanOrEqual(resolve_value(condition)),
        ),
        FilterOperator::DateRange => date_range(condition),
        FilterOperator::Unknown(name) => {
            tracing::debug!(column, operator = %name, "Unknown filter operator ignored");
            Predicate::Noop(NoopReason::UnknownOperator(name.clone()))
        }
    }
}

/// Text compares case-insensitively; numbers, booleans and dates exactly
fn equals(column: &str, value: FieldValue) -> Predicate {
    let case_insensitive = matches!(value, FieldValue::Text(_));
    Predicate::clause(
        column,
        Comparison::Equals {
            value,
            case_insensitive,
        },
    )
}

/// Rewrite textual comparisons on a boolean column as exact equalities
///
/// A spelling that matches neither value still yields unknown for null.
fn spell_booleans(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::Not(inner) => Predicate::negate(spell_booleans(*inner)),
        Predicate::Clause(clause) if clause.comparison.is_textual() => {
            let spelled = |b: bool| {
                Predicate::clause(
                    clause.column.as_str(),
                    Comparison::Equals {
                        value: FieldValue::Boolean(b),
                        case_insensitive: false,
                    },
                )
            };
            let matches =
                |b: bool| clause.comparison.evaluate(&FieldValue::Boolean(b)) == Some(true);
            match (matches(true), matches(false)) {
                (true, true) => Predicate::Or(vec![spelled(true), spelled(false)]),
                (true, false) => spelled(true),
                (false, true) => spelled(false),
                (false, false) => Predicate::And(vec![spelled(true), spelled(false)]),
            }
        }
        other => other,
    }
}

fn date_range(condition: &FilterCondition) -> Predicate {
    let Some(upper) = condition
        .value_to
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    else {
        tracing::debug!(column = %condition.column, "dateRange without upper bound ignored");
        return Predicate::Noop(NoopReason::MissingUpperBound);
    };

    match (parse_date(&condition.value), parse_date(upper)) {
        (Some(from), Some(to)) => Predicate::clause(
            condition.column.as_str(),
            Comparison::Between {
                from: FieldValue::Date(from),
                to: FieldValue::Date(to),
            },
        ),
        _ => {
            tracing::debug!(
                column = %condition.column,
                from = %condition.value,
                to = upper,
                "dateRange with invalid bound ignored"
            );
            Predicate::Noop(NoopReason::InvalidDateBound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::RecordKind;
    use chrono::NaiveDate;
    use serde_json::json;

    fn cond(column: &str, operator: FilterOperator, value: &str) -> FilterCondition {
        FilterCondition::new(column, operator, value)
    }

    fn eq_number(column: &str, n: f64) -> Predicate {
        Predicate::clause(
            column,
            Comparison::Equals {
                value: FieldValue::Number(n),
                case_insensitive: false,
            },
        )
    }

    #[test]
    fn empty_list_matches_all() {
        let compiled = compile(&[]);
        assert_eq!(compiled.predicate, Predicate::MatchAll);
        assert!(compiled.connectives.is_empty());
        assert_eq!(compiled.group_operator(), None);
    }

    #[test]
    fn single_condition_is_unwrapped() {
        let conditions = [
            cond("pohby", FilterOperator::Equals, "PL"),
            cond("pohby", FilterOperator::Unknown("like".into()), "PL"),
            cond("poh_date", FilterOperator::DateRange, "2024-01-01"),
            cond("built_year", FilterOperator::LessThan, "2000").with_logical(LogicalOperator::Or),
        ];
        for c in conditions {
            let compiled = compile(std::slice::from_ref(&c));
            assert_eq!(compiled.predicate, compile_one(&c));
            assert_eq!(compiled.group_operator(), None);
        }
    }

    #[test]
    fn any_or_after_first_makes_flat_or() {
        let conditions = [
            cond("a", FilterOperator::Equals, "1"),
            cond("b", FilterOperator::Equals, "2").with_logical(LogicalOperator::Or),
            cond("c", FilterOperator::Equals, "3"),
        ];
        let compiled = compile(&conditions);

        assert_eq!(
            compiled.predicate,
            Predicate::Or(vec![eq_number("a", 1.0), eq_number("b", 2.0), eq_number("c", 3.0)])
        );
        assert_eq!(compiled.group_operator(), Some(LogicalOperator::Or));
        assert_eq!(
            compiled.connectives,
            vec![LogicalOperator::And, LogicalOperator::Or, LogicalOperator::And]
        );
    }

    #[test]
    fn all_and_makes_flat_and() {
        let conditions = [
            cond("a", FilterOperator::Equals, "1"),
            cond("b", FilterOperator::Equals, "2"),
            cond("c", FilterOperator::Equals, "3"),
        ];
        assert_eq!(
            compile(&conditions).predicate,
            Predicate::And(vec![eq_number("a", 1.0), eq_number("b", 2.0), eq_number("c", 3.0)])
        );
    }

    #[test]
    fn first_connective_is_ignored() {
        let conditions = [
            cond("a", FilterOperator::Equals, "1").with_logical(LogicalOperator::Or),
            cond("b", FilterOperator::Equals, "2"),
        ];
        let compiled = compile(&conditions);
        assert!(matches!(compiled.predicate, Predicate::And(_)));
        assert_eq!(compiled.group_operator(), Some(LogicalOperator::And));
    }

    #[test]
    fn is_empty_ignores_value() {
        let a = compile_one(&cond("remarks", FilterOperator::IsEmpty, "anything"));
        let b = compile_one(&cond("remarks", FilterOperator::IsEmpty, ""));
        let c = compile_one(&cond("remarks", FilterOperator::IsEmpty, "2024-01-01"));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, Predicate::clause("remarks", Comparison::IsNull));

        let d = compile_one(&cond("remarks", FilterOperator::IsNotEmpty, "x"));
        let e = compile_one(&cond("remarks", FilterOperator::IsNotEmpty, "123"));
        assert_eq!(d, e);
        assert_eq!(d, Predicate::negate(Predicate::clause("remarks", Comparison::IsNull)));
    }

    #[test]
    fn equals_is_exact_for_numbers_and_booleans() {
        assert_eq!(
            compile_one(&cond("built_year", FilterOperator::Equals, "1998")),
            eq_number("built_year", 1998.0)
        );
        assert_eq!(
            compile_one(&cond("in_yard", FilterOperator::Equals, "true")),
            Predicate::clause(
                "in_yard",
                Comparison::Equals {
                    value: FieldValue::Boolean(true),
                    case_insensitive: false
                }
            )
        );
        assert_eq!(
            compile_one(&cond("pohby", FilterOperator::NotEquals, "PL")),
            Predicate::negate(Predicate::clause(
                "pohby",
                Comparison::Equals {
                    value: FieldValue::Text("PL".into()),
                    case_insensitive: true
                }
            ))
        );
    }

    #[test]
    fn text_operators_keep_raw_operand() {
        assert_eq!(
            compile_one(&cond("coach_code", FilterOperator::Contains, "1.50")),
            Predicate::clause("coach_code", Comparison::Contains("1.50".into()))
        );
        assert_eq!(
            compile_one(&cond("remarks", FilterOperator::NotContains, "brake")),
            Predicate::negate(Predicate::clause("remarks", Comparison::Contains("brake".into())))
        );
        assert_eq!(
            compile_one(&cond("coachno", FilterOperator::StartsWith, "98")),
            Predicate::clause("coachno", Comparison::StartsWith("98".into()))
        );
        assert_eq!(
            compile_one(&cond("coachno", FilterOperator::EndsWith, "01")),
            Predicate::clause("coachno", Comparison::EndsWith("01".into()))
        );
    }

    #[test]
    fn ordering_operators_use_resolved_value() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            compile_one(&cond("poh_date", FilterOperator::GreaterThanOrEqual, "2024-01-15")),
            Predicate::clause("poh_date", Comparison::GreaterThanOrEqual(FieldValue::Date(day)))
        );
        assert_eq!(
            compile_one(&cond("codal_life", FilterOperator::LessThanOrEqual, "25")),
            Predicate::clause("codal_life", Comparison::LessThanOrEqual(FieldValue::Number(25.0)))
        );
    }

    #[test]
    fn date_range_degenerate_cases() {
        let missing = cond("poh_date", FilterOperator::DateRange, "2024-01-01");
        assert_eq!(compile_one(&missing), Predicate::Noop(NoopReason::MissingUpperBound));

        let empty = missing.clone().with_value_to("  ");
        assert_eq!(compile_one(&empty), Predicate::Noop(NoopReason::MissingUpperBound));

        let invalid = missing.clone().with_value_to("someday");
        assert_eq!(compile_one(&invalid), Predicate::Noop(NoopReason::InvalidDateBound));

        let valid = missing.with_value_to("2024-03-31");
        assert!(matches!(
            compile_one(&valid),
            Predicate::Clause(ref c) if matches!(c.comparison, Comparison::Between { .. })
        ));
    }

    #[test]
    fn unknown_operator_is_noop() {
        let p = compile_one(&cond("pohby", FilterOperator::Unknown("regex".into()), ".*"));
        assert_eq!(p, Predicate::Noop(NoopReason::UnknownOperator("regex".into())));
    }

    #[test]
    fn noop_member_of_or_group_matches_everything() {
        let conditions = [
            cond("pohby", FilterOperator::Equals, "PL"),
            cond("pohby", FilterOperator::Unknown("fuzzy".into()), "x")
                .with_logical(LogicalOperator::Or),
        ];
        let compiled = compile(&conditions);
        let record =
            Record::from_json(RecordKind::Master, &json!({"coachno": "1", "pohby": "JP"}))
                .unwrap();
        assert!(compiled.matches(&record));
    }

    #[test]
    fn mixed_connectives_are_flattened() {
        let records: Vec<Record> = [
            json!({"coachno": "1", "pohby": "PL", "built_year": 1990}),
            json!({"coachno": "2", "pohby": "JP", "built_year": 2010}),
            json!({"coachno": "3", "pohby": "PL", "built_year": 2012}),
        ]
        .iter()
        .map(|v| Record::from_json(RecordKind::Master, v).unwrap())
        .collect();

        // pohby = PL AND built_year > 2000 OR coachno = 2
        let conditions = [
            cond("pohby", FilterOperator::Equals, "PL"),
            cond("built_year", FilterOperator::GreaterThan, "2000"),
            cond("coachno", FilterOperator::Equals, "2").with_logical(LogicalOperator::Or),
        ];
        let compiled = compile(&conditions);
        let selected: Vec<String> = records
            .iter()
            .filter(|r| compiled.matches(r))
            .filter_map(|r| r.identity())
            .collect();

        // Flat OR selects every record, where precedence would drop coach 1
        assert_eq!(selected, vec!["1", "2", "3"]);
    }

    #[test]
    fn text_columns_keep_operand_text() {
        let compiled = compile_for(
            RecordKind::Master,
            &[cond("coachno", FilterOperator::Equals, "04512")],
        );
        assert_eq!(
            compiled.predicate,
            Predicate::clause(
                "coachno",
                Comparison::Equals {
                    value: FieldValue::Text("04512".into()),
                    case_insensitive: true
                }
            )
        );

        let record =
            Record::from_json(RecordKind::Master, &json!({"coachno": "4512"})).unwrap();
        assert!(!compiled.matches(&record));

        // Typed columns still infer
        let compiled = compile_for(
            RecordKind::Master,
            &[cond("built_year", FilterOperator::Equals, "1998")],
        );
        assert_eq!(compiled.predicate, eq_number("built_year", 1998.0));
    }

    #[test]
    fn boolean_columns_spell_text_operators() {
        let eq_bool = |b: bool| {
            Predicate::clause(
                "in_yard",
                Comparison::Equals {
                    value: FieldValue::Boolean(b),
                    case_insensitive: false,
                },
            )
        };
        let compile_in_yard = |operator: FilterOperator, value: &str| {
            compile_for(RecordKind::Master, &[cond("in_yard", operator, value)]).predicate
        };

        assert_eq!(compile_in_yard(FilterOperator::Contains, "tru"), eq_bool(true));
        assert_eq!(compile_in_yard(FilterOperator::EndsWith, "SE"), eq_bool(false));
        assert_eq!(compile_in_yard(FilterOperator::Equals, "TRUE"), eq_bool(true));
        assert_eq!(
            compile_in_yard(FilterOperator::Contains, "e"),
            Predicate::Or(vec![eq_bool(true), eq_bool(false)])
        );
        assert_eq!(
            compile_in_yard(FilterOperator::NotContains, "yes"),
            Predicate::negate(Predicate::And(vec![eq_bool(true), eq_bool(false)]))
        );
        assert_eq!(compile_in_yard(FilterOperator::Equals, "false"), eq_bool(false));
    }

    #[test]
    fn unmatched_boolean_spelling_stays_unknown_for_null() {
        let compiled = compile_for(
            RecordKind::Master,
            &[cond("in_yard", FilterOperator::NotContains, "yes")],
        );
        let unset = Record::from_json(RecordKind::Master, &json!({"coachno": "1"})).unwrap();
        let set = Record::from_json(RecordKind::Master, &json!({"coachno": "2", "in_yard": true}))
            .unwrap();
        assert_eq!(compiled.predicate.evaluate(&unset), None);
        assert!(compiled.matches(&set));
    }

    #[test]
    fn malformed_search_filter_is_ignored() {
        let limits = FilterLimits {
            max_json_bytes: 1024,
            max_conditions: 1,
        };
        let malformed = [
            "not json",
            r#"{"column": "pohby"}"#,
            r#"[{"column": "colour", "operator": "equals", "value": "red"}]"#,
            r#"[{"column": "pohby", "operator": "equals", "value": "PL"},
                {"column": "pohby", "operator": "equals", "value": "JP"}]"#,
        ];
        for json_str in malformed {
            let compiled = compile_lenient(json_str, RecordKind::Master, &limits);
            assert_eq!(compiled.predicate, Predicate::MatchAll, "{}", json_str);
            assert!(compiled.connectives.is_empty());
        }

        let valid = r#"[{"column": "coachno", "operator": "equals", "value": "04512"}]"#;
        let compiled = compile_lenient(valid, RecordKind::Master, &limits);
        assert_eq!(
            compiled.predicate,
            Predicate::clause(
                "coachno",
                Comparison::Equals {
                    value: FieldValue::Text("04512".into()),
                    case_insensitive: true
                }
            )
        );
    }

    #[test]
    fn pohby_equals_matches_direct_equality() {
        let records: Vec<Record> = [
            json!({"coachno": "1", "pohby": "PL"}),
            json!({"coachno": "2", "pohby": "pl"}),
            json!({"coachno": "3", "pohby": "JP"}),
            json!({"coachno": "4"}),
        ]
        .iter()
        .map(|v| Record::from_json(RecordKind::Master, v).unwrap())
        .collect();

        let compiled = compile(&[cond("pohby", FilterOperator::Equals, "PL")]);
        let via_filter: Vec<&Record> = records.iter().filter(|r| compiled.matches(r)).collect();
        let direct: Vec<&Record> = records
            .iter()
            .filter(|r| {
                r.get("pohby")
                    .to_text()
                    .is_some_and(|s| s.eq_ignore_ascii_case("PL"))
            })
            .collect();

        assert_eq!(via_filter, direct);
        assert_eq!(via_filter.len(), 2);
    }
}
