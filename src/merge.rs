//! Dictionary merging and structural deduplication.
//!
//! Every import and append path goes through these two functions so that
//! importing the same fragment twice yields the same document as
//! importing it once.

use serde_json::Value;
use std::collections::HashSet;

use crate::model::JsonMap;

/// Recursively merge `overlay` into `base`.
///
/// - both values are objects: keys are merged recursively
/// - anything else: `overlay` wins
///
/// # Arguments
/// * `base` - Existing document
/// * `overlay` - Incoming document whose values take precedence
///
/// # Returns
/// A new merged value; neither input is modified.
pub fn merge_dicts(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_maps(base_map, overlay_map))
        }
        _ => overlay.clone(),
    }
}

/// [`merge_dicts`] on bare maps.
pub fn merge_maps(base: &JsonMap, overlay: &JsonMap) -> JsonMap {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let next = match merged.get(key) {
            Some(existing) => merge_dicts(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

/// Shallow overlay: every key of `overrides` replaces the same key of
/// `defaults`, nested objects included.
pub fn overlay_params(defaults: &JsonMap, overrides: &JsonMap) -> JsonMap {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Serialize a value with object keys sorted at every depth.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Remove structurally equal items, keeping the first occurrence of each
/// in the original order.
pub fn dedup(items: &[Value]) -> Vec<Value> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(canonical_string(item)))
        .cloned()
        .collect()
}

/// [`dedup`] for any serializable item type.
///
/// # Errors
/// Fails if an item cannot be serialized.
pub fn dedup_by_value<T>(items: Vec<T>) -> Result<Vec<T>, serde_json::Error>
where
    T: serde::Serialize,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(canonical_string(&serde_json::to_value(&item)?)) {
            unique.push(item);
        }
    }
    Ok(unique)
}
