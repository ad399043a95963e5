//! JSON utility functions

use serde_json::{Map, Value as JsonValue};

/// Converts a JsonValue to Option<String>, returning None for null values.
///
/// Keeps `JsonValue::Null` out of TEXT columns as the string `"null"`.
pub fn json_to_opt_string(value: &JsonValue) -> Option<String> {
    if value.is_null() {
        None
    } else {
        serde_json::to_string(value).ok()
    }
}

/// Parse an optional JSON TEXT column, treating malformed text as absent
pub fn opt_string_to_json(text: Option<&str>) -> Option<JsonValue> {
    text.and_then(|s| serde_json::from_str(s).ok())
}

/// Serialize with object keys sorted at every level
///
/// Two values that differ only in key order produce the same string.
pub fn canonical_json(value: &JsonValue) -> String {
    sorted(value).to_string()
}

fn sorted(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
