//! In-process [`DocumentStore`] with optional JSON snapshots.

use log::{debug, info};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{DocumentStore, Filter, Patch, StoreError, UpdateCount};
use crate::model::ids::generate_document_id;

/// Collections of documents behind a single reader/writer lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryStore::save`]. A missing file
    /// yields an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!("No store snapshot at {:?}, starting empty", path);
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path)?;
        let collections: BTreeMap<String, Vec<Value>> = serde_json::from_str(&contents)?;
        info!(
            "Loaded store snapshot {:?} ({} collections)",
            path,
            collections.len()
        );
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    /// Write every collection to `path` as one JSON object.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = {
            let collections = self.collections.read();
            serde_json::to_string_pretty(&*collections)?
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        debug!("Saved store snapshot to {:?}", path);
        Ok(())
    }

    /// Number of documents in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    fn find_all(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&self, collection: &str, mut document: Value) -> Result<String, StoreError> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::NotAnObject(collection.to_string()))?;
        let id = match object.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = generate_document_id();
                object.insert("_id".to_string(), Value::String(id.clone()));
                id
            }
        };
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateCount, StoreError> {
        let mut collections = self.collections.write();
        let mut count = UpdateCount::default();
        let docs = match collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(count),
        };

        // Patch copies first so a failure on any document changes none.
        let mut staged = Vec::new();
        for (index, doc) in docs.iter().enumerate() {
            if !filter.matches(doc) {
                continue;
            }
            count.matched += 1;
            let mut patched = doc.clone();
            if patch.apply(&mut patched)? {
                staged.push((index, patched));
            }
        }
        count.modified = staged.len();
        for (index, patched) in staged {
            docs[index] = patched;
        }
        Ok(count)
    }

    fn delete(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        let mut collections = self.collections.write();
        let removed = match collections.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|doc| !filter.matches(doc));
                before - docs.len()
            }
            None => 0,
        };
        Ok(removed)
    }
}
