//! Structural diff between two JSON snapshots
//!
//! The result holds only what changed, as two parallel fragments:
//! - equal values give no fragments at all;
//! - a null side, a scalar or a shape mismatch gives both values verbatim;
//! - objects give the keys whose values differ, compared shallowly;
//! - arrays give the changed entries, each object entry tagged with `_id`.
//!
//! Whenever both fragments are present their keys and positions line up.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::data::types::IDENTITY_FIELD;
use crate::utils::json::canonical_json;

/// Key that names the entity behind a changed array entry
pub const SYNTHETIC_ID_KEY: &str = "_id";

/// Fallback identifier key when the natural identifier is absent
const FALLBACK_ID_KEY: &str = "id";

static NULL: JsonValue = JsonValue::Null;

/// Minimal before/after change-set; `None` on both sides means unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    pub old_diff: Option<JsonValue>,
    pub new_diff: Option<JsonValue>,
}

impl ChangeSet {
    pub fn is_unchanged(&self) -> bool {
        self.old_diff.is_none() && self.new_diff.is_none()
    }
}

/// How array entries are paired before diffing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayAlignment {
    /// Entry `i` of the old array pairs with entry `i` of the new array
    #[default]
    Positional,
    /// Entries pair by identifier; unmatched entries pair with null
    ByIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Natural identifier read for `_id` tags
    pub identity_field: String,
    pub alignment: ArrayAlignment,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            identity_field: IDENTITY_FIELD.to_string(),
            alignment: ArrayAlignment::default(),
        }
    }
}

/// Diff two snapshots with positional array alignment and `coachno` tags
pub fn diff(old: &JsonValue, new: &JsonValue) -> ChangeSet {
    diff_with(old, new, &DiffOptions::default())
}

/// Diff two snapshots with explicit options
pub fn diff_with(old: &JsonValue, new: &JsonValue, options: &DiffOptions) -> ChangeSet {
    match diff_value(old, new, options) {
        Some((old_diff, new_diff)) => ChangeSet {
            old_diff: Some(old_diff),
            new_diff: Some(new_diff),
        },
        None => ChangeSet::default(),
    }
}

fn diff_value(
    old: &JsonValue,
    new: &JsonValue,
    options: &DiffOptions,
) -> Option<(JsonValue, JsonValue)> {
    if old == new {
        return None;
    }
    match (old, new) {
        (JsonValue::Array(a), JsonValue::Array(b)) => diff_arrays(a, b, options),
        (JsonValue::Object(a), JsonValue::Object(b)) => diff_objects(a, b),
        _ => Some((old.clone(), new.clone())),
    }
}

fn diff_objects(
    old: &Map<String, JsonValue>,
    new: &Map<String, JsonValue>,
) -> Option<(JsonValue, JsonValue)> {
    let mut old_out = Map::new();
    let mut new_out = Map::new();

    let new_only = new.keys().filter(|k| !old.contains_key(*k));
    for key in old.keys().chain(new_only) {
        let o = old.get(key).unwrap_or(&NULL);
        let n = new.get(key).unwrap_or(&NULL);
        if canonical_json(o) != canonical_json(n) {
            old_out.insert(key.clone(), o.clone());
            new_out.insert(key.clone(), n.clone());
        }
    }

    if old_out.is_empty() {
        None
    } else {
        Some((JsonValue::Object(old_out), JsonValue::Object(new_out)))
    }
}

/// One aligned pair of array entries plus its fallback index
struct Pair<'a> {
    old: &'a JsonValue,
    new: &'a JsonValue,
    index: usize,
}

fn diff_arrays(
    old: &[JsonValue],
    new: &[JsonValue],
    options: &DiffOptions,
) -> Option<(JsonValue, JsonValue)> {
    let pairs = match options.alignment {
        ArrayAlignment::Positional => align_positional(old, new),
        ArrayAlignment::ByIdentity => align_by_identity(old, new, options),
    };

    let mut old_out = Vec::new();
    let mut new_out = Vec::new();

    for pair in pairs {
        let Some((o, n)) = diff_value(pair.old, pair.new, options) else {
            continue;
        };
        let id = synthetic_id(pair.old, pair.new, pair.index, options);
        old_out.push(tag(o, &id));
        new_out.push(tag(n, &id));
    }

    if old_out.is_empty() {
        None
    } else {
        Some((JsonValue::Array(old_out), JsonValue::Array(new_out)))
    }
}

fn align_positional<'a>(old: &'a [JsonValue], new: &'a [JsonValue]) -> Vec<Pair<'a>> {
    (0..old.len().max(new.len()))
        .map(|index| Pair {
            old: old.get(index).unwrap_or(&NULL),
            new: new.get(index).unwrap_or(&NULL),
            index,
        })
        .collect()
}

/// Pair entries by identifier, keeping new-array order
///
/// Entries without an identifier pair positionally among themselves. Old
/// entries left unmatched follow, paired with null.
fn align_by_identity<'a>(
    old: &'a [JsonValue],
    new: &'a [JsonValue],
    options: &DiffOptions,
) -> Vec<Pair<'a>> {
    let mut keyed: HashMap<String, Vec<usize>> = HashMap::new();
    let mut unkeyed: Vec<usize> = Vec::new();
    for (i, item) in old.iter().enumerate() {
        match item_key(item, options) {
            Some(key) => keyed.entry(key).or_default().push(i),
            None => unkeyed.push(i),
        }
    }
    for indices in keyed.values_mut() {
        indices.reverse();
    }
    unkeyed.reverse();

    let mut used = vec![false; old.len()];
    let mut pairs = Vec::with_capacity(old.len().max(new.len()));

    for (index, item) in new.iter().enumerate() {
        let matched = match item_key(item, options) {
            Some(key) => keyed.get_mut(&key).and_then(Vec::pop),
            None => unkeyed.pop(),
        };
        let old_item = match matched {
            Some(i) => {
                used[i] = true;
                &old[i]
            }
            None => &NULL,
        };
        pairs.push(Pair {
            old: old_item,
            new: item,
            index,
        });
    }

    for (index, item) in old.iter().enumerate() {
        if !used[index] {
            pairs.push(Pair {
                old: item,
                new: &NULL,
                index,
            });
        }
    }

    pairs
}

fn field_of<'a>(item: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    item.as_object()
        .and_then(|map| map.get(key))
        .filter(|v| !v.is_null())
}

fn item_key(item: &JsonValue, options: &DiffOptions) -> Option<String> {
    field_of(item, &options.identity_field)
        .or_else(|| field_of(item, FALLBACK_ID_KEY))
        .map(canonical_json)
}

/// Natural identifier, else `id`, else the index; new entry before old
fn synthetic_id(
    old: &JsonValue,
    new: &JsonValue,
    index: usize,
    options: &DiffOptions,
) -> JsonValue {
    [options.identity_field.as_str(), FALLBACK_ID_KEY]
        .iter()
        .find_map(|key| field_of(new, key).or_else(|| field_of(old, key)))
        .cloned()
        .unwrap_or_else(|| JsonValue::from(index))
}

/// Prefix an object fragment with `_id`; other fragments pass through
fn tag(fragment: JsonValue, id: &JsonValue) -> JsonValue {
    match fragment {
        JsonValue::Object(map) => {
            let mut tagged = Map::with_capacity(map.len() + 1);
            tagged.insert(SYNTHETIC_ID_KEY.to_string(), id.clone());
            for (key, value) in map {
                if key != SYNTHETIC_ID_KEY {
                    tagged.insert(key, value);
                }
            }
            JsonValue::Object(tagged)
        }
        other => other,
    }
}
