//! Document store contract.
//!
//! The catalog and topology services only talk to a [`DocumentStore`]:
//! named collections of JSON documents addressed by equality filters and
//! modified by patches. Each `update` call applies its patch to every
//! matching document under one exclusive lock, which is what makes
//! push-if-absent usable as a uniqueness guard.

pub mod memory;

use serde_json::Value;
use std::collections::HashSet;

use crate::merge::{canonical_string, merge_dicts};
use crate::model::JsonMap;

pub use memory::MemoryStore;

/// Collection holding equipment library documents.
pub const LIBRARIES: &str = "equipment_libraries";
/// Collection holding network documents.
pub const NETWORKS: &str = "networks";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid document path '{0}'")]
    InvalidPath(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document inserted into '{0}' is not an object")]
    NotAnObject(String),
}

/// Conjunction of equality conditions on dotted paths.
///
/// A condition whose path crosses an array holds when any element of that
/// array satisfies the rest of the path, and a condition whose path ends
/// on an array holds when the array contains the expected value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::all().eq("_id", id)
    }

    pub fn eq(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((path.to_string(), value.into()));
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|(path, expected)| {
            let segments: Vec<&str> = path.split('.').collect();
            path_matches(document, &segments, expected)
        })
    }
}

fn path_matches(value: &Value, segments: &[&str], expected: &Value) -> bool {
    match segments.split_first() {
        None => {
            value == expected
                || value
                    .as_array()
                    .map_or(false, |items| items.contains(expected))
        }
        Some((head, rest)) => match value {
            Value::Object(map) => map
                .get(*head)
                .map_or(false, |next| path_matches(next, rest, expected)),
            Value::Array(items) => items
                .iter()
                .any(|item| path_matches(item, segments, expected)),
            _ => false,
        },
    }
}

/// A single modification of one document.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Set the value at `path`, creating intermediate objects.
    Set { path: String, value: Value },
    /// Append to the array at `path`, creating it when missing.
    Push { path: String, value: Value },
    /// Append to the array at `path` unless an item with the same `key`
    /// value is already present.
    PushIfAbsent { path: String, key: String, value: Value },
    /// Remove every item of the array at `path` whose `key` equals `value`.
    Pull { path: String, key: String, value: Value },
    /// Like `Pull`, but succeeds when nothing matched.
    Discard { path: String, key: String, value: Value },
    /// Replace the first item of the array at `path` whose `key` equals
    /// `value`.
    SetWhere {
        path: String,
        key: String,
        value: Value,
        replacement: Value,
    },
    /// Shallow-merge `fields` into the first item of the array at `path`
    /// whose `key` equals `value`.
    MergeWhere {
        path: String,
        key: String,
        value: Value,
        fields: JsonMap,
    },
    /// Append each of `values` to the array at `path` unless a
    /// structurally equal item is already there.
    AddEach { path: String, values: Vec<Value> },
    /// Recursively merge `value` into the object at `path`.
    MergeInto { path: String, value: Value },
    /// Require every `keys` value of the items at `path` to appear as a
    /// `target_key` value of the items at `target`.
    RequireRefs {
        path: String,
        keys: Vec<String>,
        target: String,
        target_key: String,
    },
}

/// Ordered operations applied to each matching document.
///
/// A conditional operation (`PushIfAbsent`, `Pull`, `SetWhere`,
/// `MergeWhere`, `RequireRefs`) that does not hold leaves the document
/// untouched and skips the operations after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Set {
            path: path.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn push(mut self, path: &str, value: Value) -> Self {
        self.ops.push(PatchOp::Push {
            path: path.to_string(),
            value,
        });
        self
    }

    pub fn push_if_absent(mut self, path: &str, key: &str, value: Value) -> Self {
        self.ops.push(PatchOp::PushIfAbsent {
            path: path.to_string(),
            key: key.to_string(),
            value,
        });
        self
    }

    pub fn pull(mut self, path: &str, key: &str, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Pull {
            path: path.to_string(),
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn discard(mut self, path: &str, key: &str, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Discard {
            path: path.to_string(),
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn set_where(
        mut self,
        path: &str,
        key: &str,
        value: impl Into<Value>,
        replacement: Value,
    ) -> Self {
        self.ops.push(PatchOp::SetWhere {
            path: path.to_string(),
            key: key.to_string(),
            value: value.into(),
            replacement,
        });
        self
    }

    pub fn merge_where(
        mut self,
        path: &str,
        key: &str,
        value: impl Into<Value>,
        fields: JsonMap,
    ) -> Self {
        self.ops.push(PatchOp::MergeWhere {
            path: path.to_string(),
            key: key.to_string(),
            value: value.into(),
            fields,
        });
        self
    }

    pub fn add_each(mut self, path: &str, values: Vec<Value>) -> Self {
        self.ops.push(PatchOp::AddEach {
            path: path.to_string(),
            values,
        });
        self
    }

    pub fn merge_into(mut self, path: &str, value: Value) -> Self {
        self.ops.push(PatchOp::MergeInto {
            path: path.to_string(),
            value,
        });
        self
    }

    pub fn require_refs(mut self, path: &str, keys: &[&str], target: &str, target_key: &str) -> Self {
        self.ops.push(PatchOp::RequireRefs {
            path: path.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            target: target.to_string(),
            target_key: target_key.to_string(),
        });
        self
    }

    /// Apply to `document`. Returns `Ok(false)` when a conditional
    /// operation had nothing to do; `document` is then unchanged.
    pub fn apply(&self, document: &mut Value) -> Result<bool, StoreError> {
        let mut working = document.clone();
        for op in &self.ops {
            if !apply_op(&mut working, op)? {
                return Ok(false);
            }
        }
        *document = working;
        Ok(true)
    }
}

fn apply_op(document: &mut Value, op: &PatchOp) -> Result<bool, StoreError> {
    match op {
        PatchOp::Set { path, value } => {
            *slot_mut(document, path)? = value.clone();
            Ok(true)
        }
        PatchOp::Push { path, value } => {
            array_mut(document, path)?.push(value.clone());
            Ok(true)
        }
        PatchOp::PushIfAbsent { path, key, value } => {
            let items = array_mut(document, path)?;
            let wanted = value.get(key.as_str());
            if items.iter().any(|item| item.get(key.as_str()) == wanted) {
                return Ok(false);
            }
            items.push(value.clone());
            Ok(true)
        }
        PatchOp::Pull { path, key, value } => {
            let items = array_mut(document, path)?;
            let before = items.len();
            items.retain(|item| item.get(key.as_str()) != Some(value));
            Ok(items.len() != before)
        }
        PatchOp::Discard { path, key, value } => {
            array_mut(document, path)?.retain(|item| item.get(key.as_str()) != Some(value));
            Ok(true)
        }
        PatchOp::SetWhere {
            path,
            key,
            value,
            replacement,
        } => {
            let items = array_mut(document, path)?;
            match items
                .iter_mut()
                .find(|item| item.get(key.as_str()) == Some(value))
            {
                Some(item) => {
                    *item = replacement.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        PatchOp::MergeWhere {
            path,
            key,
            value,
            fields,
        } => {
            let items = array_mut(document, path)?;
            let item = match items
                .iter_mut()
                .find(|item| item.get(key.as_str()) == Some(value))
            {
                Some(item) => item,
                None => return Ok(false),
            };
            let object = item
                .as_object_mut()
                .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
            for (field, field_value) in fields {
                object.insert(field.clone(), field_value.clone());
            }
            Ok(true)
        }
        PatchOp::AddEach { path, values } => {
            let items = array_mut(document, path)?;
            let mut seen: HashSet<String> = items.iter().map(canonical_string).collect();
            for value in values {
                if seen.insert(canonical_string(value)) {
                    items.push(value.clone());
                }
            }
            Ok(true)
        }
        PatchOp::MergeInto { path, value } => {
            let slot = slot_mut(document, path)?;
            let merged = if slot.is_null() {
                value.clone()
            } else {
                merge_dicts(slot, value)
            };
            *slot = merged;
            Ok(true)
        }
        PatchOp::RequireRefs {
            path,
            keys,
            target,
            target_key,
        } => {
            let known: HashSet<String> = lookup(document, target)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get(target_key.as_str()))
                        .map(canonical_string)
                        .collect()
                })
                .unwrap_or_default();
            let items = lookup(document, path)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            Ok(items.iter().all(|item| {
                keys.iter()
                    .all(|k| item.get(k.as_str()).map_or(false, |v| known.contains(&canonical_string(v))))
            }))
        }
    }
}

/// Value at a dotted path, if present.
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| current.get(segment))
}

/// Mutable slot at a dotted path, creating intermediate objects.
fn slot_mut<'a>(document: &'a mut Value, path: &str) -> Result<&'a mut Value, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let mut current = document;
    for segment in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Default::default());
        }
        current = current
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?
            .entry(segment)
            .or_insert(Value::Null);
    }
    Ok(current)
}

fn array_mut<'a>(document: &'a mut Value, path: &str) -> Result<&'a mut Vec<Value>, StoreError> {
    let slot = slot_mut(document, path)?;
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCount {
    /// Documents selected by the filter.
    pub matched: usize,
    /// Documents the patch actually changed.
    pub modified: usize,
}

/// Opaque document store.
pub trait DocumentStore: Send + Sync {
    /// First document of `collection` matching `filter`.
    fn find(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError>;

    /// Every document of `collection` matching `filter`, in insertion order.
    fn find_all(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Insert an object document. A missing `_id` is generated. Returns the id.
    fn insert(&self, collection: &str, document: Value) -> Result<String, StoreError>;

    /// Apply `patch` atomically to every matching document.
    fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateCount, StoreError>;

    /// Remove every matching document. Returns the number removed.
    fn delete(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError>;
}
