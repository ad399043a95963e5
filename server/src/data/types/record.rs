//! Coach record model
//!
//! Each record kind carries a static table of known fields. Records are maps
//! from field name to `FieldValue`, checked against that table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::value::{FieldKind, FieldValue};

/// Natural identifier of a coach in both master and history records
pub const IDENTITY_FIELD: &str = "coachno";

static NULL_VALUE: FieldValue = FieldValue::Null;

/// A known field of a record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const MASTER_FIELDS: &[FieldSpec] = &[
    field("coachno", FieldKind::Text),
    field("coach_type", FieldKind::Text),
    field("coach_code", FieldKind::Text),
    field("owning_rly", FieldKind::Text),
    field("base_depot", FieldKind::Text),
    field("built_year", FieldKind::Number),
    field("manufacturer", FieldKind::Text),
    field("pohby", FieldKind::Text),
    field("poh_date", FieldKind::Date),
    field("ioh_date", FieldKind::Date),
    field("return_date", FieldKind::Date),
    field("next_poh_due", FieldKind::Date),
    field("in_yard", FieldKind::Boolean),
    field("yard_in_date", FieldKind::Date),
    field("yard_out_date", FieldKind::Date),
    field("battery_status", FieldKind::Text),
    field("battery_date", FieldKind::Date),
    field("upholstery_status", FieldKind::Text),
    field("upholstery_date", FieldKind::Date),
    field("brake_test_date", FieldKind::Date),
    field("fire_extinguisher_fitment_date", FieldKind::Date),
    field("codal_life", FieldKind::Number),
    field("air_conditioned", FieldKind::Boolean),
    field("remarks", FieldKind::Text),
];

const HISTORY_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Number),
    field("coachno", FieldKind::Text),
    field("coach_type", FieldKind::Text),
    field("owning_rly", FieldKind::Text),
    field("pohby", FieldKind::Text),
    field("poh_date", FieldKind::Date),
    field("ioh_date", FieldKind::Date),
    field("return_date", FieldKind::Date),
    field("work_done", FieldKind::Text),
    field("recorded_at", FieldKind::Date),
    field("remarks", FieldKind::Text),
];

/// Record kind: current master state or historical state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Master,
    History,
}

impl RecordKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Master => "master",
            RecordKind::History => "history",
        }
    }

    /// Backing table name
    pub const fn table(&self) -> &'static str {
        match self {
            RecordKind::Master => "coach_master",
            RecordKind::History => "coach_history",
        }
    }

    /// Known fields, in storage column order
    pub const fn fields(&self) -> &'static [FieldSpec] {
        match self {
            RecordKind::Master => MASTER_FIELDS,
            RecordKind::History => HISTORY_FIELDS,
        }
    }

    /// Primary key column, which also orders search results
    pub const fn order_column(&self) -> &'static str {
        match self {
            RecordKind::Master => IDENTITY_FIELD,
            RecordKind::History => "id",
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Field names usable in filter conditions
    pub fn filterable_columns(&self) -> Vec<&'static str> {
        self.fields().iter().map(|f| f.name).collect()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "master" => Ok(RecordKind::Master),
            "history" => Ok(RecordKind::History),
            _ => Err(format!(
                "Invalid record kind '{}'. Valid options: master, history",
                s
            )),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("Expected a JSON object for a {0} record")]
    NotAnObject(RecordKind),

    #[error("Unknown field '{field}' for {kind} records")]
    UnknownField { kind: RecordKind, field: String },

    #[error("Invalid value for field '{field}': expected {expected}, got {found}")]
    InvalidValue {
        field: String,
        expected: FieldKind,
        found: String,
    },

    #[error("Missing 'coachno' for {0} record")]
    MissingIdentity(RecordKind),
}

/// A typed coach record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: RecordKind,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Build a record from a JSON object, checking names and types
    pub fn from_json(kind: RecordKind, value: &JsonValue) -> Result<Self, RecordError> {
        let object = value.as_object().ok_or(RecordError::NotAnObject(kind))?;
        let mut record = Self::new(kind);
        for (name, raw) in object {
            let spec = kind.field(name).ok_or_else(|| RecordError::UnknownField {
                kind,
                field: name.clone(),
            })?;
            let value =
                FieldValue::from_json(spec.kind, raw).ok_or_else(|| RecordError::InvalidValue {
                    field: name.clone(),
                    expected: spec.kind,
                    found: raw.to_string(),
                })?;
            record.fields.insert(name.clone(), value);
        }
        if record.identity().is_none() {
            return Err(RecordError::MissingIdentity(kind));
        }
        Ok(record)
    }

    /// JSON object in field-table order, omitting fields never set
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for spec in self.kind.fields() {
            if let Some(value) = self.fields.get(spec.name) {
                map.insert(spec.name.to_string(), value.to_json());
            }
        }
        JsonValue::Object(map)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Field value, null when the field is absent
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&NULL_VALUE)
    }

    /// Set a field, rejecting unknown names and mismatched kinds
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<(), RecordError> {
        check_value(self.kind, name, &value)?;
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    /// Fields that were explicitly set, in name order
    pub fn fields_set(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Natural identifier as text
    pub fn identity(&self) -> Option<String> {
        self.get(IDENTITY_FIELD).to_text().filter(|s| !s.is_empty())
    }
}

/// JSON array snapshot of records, as stored in audit change-sets
pub fn records_to_json(records: &[Record]) -> JsonValue {
    JsonValue::Array(records.iter().map(Record::to_json).collect())
}

/// Check a value against a record kind's field table
pub fn check_value(kind: RecordKind, name: &str, value: &FieldValue) -> Result<(), RecordError> {
    let spec = kind.field(name).ok_or_else(|| RecordError::UnknownField {
        kind,
        field: name.to_string(),
    })?;
    match value.kind() {
        None => Ok(()),
        Some(found) if found == spec.kind => Ok(()),
        Some(found) => Err(RecordError::InvalidValue {
            field: name.to_string(),
            expected: spec.kind,
            found: found.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("master".parse::<RecordKind>(), Ok(RecordKind::Master));
        assert_eq!("HISTORY".parse::<RecordKind>(), Ok(RecordKind::History));
        assert!("coaches".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_field_tables_have_identity() {
        for kind in [RecordKind::Master, RecordKind::History] {
            assert!(kind.field(IDENTITY_FIELD).is_some());
            assert!(kind.field(kind.order_column()).is_some());
        }
    }

    #[test]
    fn test_from_json_typed() {
        let record = Record::from_json(
            RecordKind::Master,
            &json!({
                "coachno": "204512",
                "built_year": 2004,
                "poh_date": "2023-11-02",
                "in_yard": false,
                "remarks": null
            }),
        )
        .unwrap();

        assert_eq!(record.identity().as_deref(), Some("204512"));
        assert_eq!(record.get("built_year"), &FieldValue::Number(2004.0));
        assert!(matches!(record.get("poh_date"), FieldValue::Date(_)));
        assert_eq!(record.get("in_yard"), &FieldValue::Boolean(false));
        assert!(record.get("remarks").is_null());
        assert!(record.get("pohby").is_null());
    }

    #[test]
    fn test_from_json_rejects_unknown_field() {
        let err = Record::from_json(
            RecordKind::Master,
            &json!({"coachno": "1", "colour": "blue"}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RecordError::UnknownField {
                kind: RecordKind::Master,
                field: "colour".to_string()
            }
        );
    }

    #[test]
    fn test_from_json_rejects_bad_type() {
        let err = Record::from_json(
            RecordKind::Master,
            &json!({"coachno": "1", "poh_date": "last spring"}),
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidValue { ref field, .. } if field == "poh_date"));
    }

    #[test]
    fn test_from_json_requires_identity() {
        let err = Record::from_json(RecordKind::History, &json!({"pohby": "PL"})).unwrap_err();
        assert_eq!(err, RecordError::MissingIdentity(RecordKind::History));
    }

    #[test]
    fn test_to_json_roundtrips_field_order() {
        let input = json!({"pohby": "PL", "coachno": "98301", "built_year": 1998});
        let record = Record::from_json(RecordKind::Master, &input).unwrap();
        let output = record.to_json();
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["coachno", "built_year", "pohby"]);
        assert_eq!(output, input);
    }

    #[test]
    fn test_set_checks_kind() {
        let mut record = Record::new(RecordKind::Master);
        assert!(
            record
                .set("battery_status", FieldValue::Text("OK".into()))
                .is_ok()
        );
        assert!(record.set("in_yard", FieldValue::Number(1.0)).is_err());
        assert!(record.set("no_such_field", FieldValue::Null).is_err());
        assert!(record.set("yard_in_date", FieldValue::Null).is_ok());
    }
}
