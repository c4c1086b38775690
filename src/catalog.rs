//! Equipment catalog.
//!
//! Owns the equipment library documents and enforces that `type_variety`
//! is unique within each category of a library. Every mutation of a
//! category is one store update, so concurrent adds of the same key
//! cannot both succeed.

use chrono::Utc;
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::ids::generate_document_id;
use crate::model::{Category, Equipment, EquipmentLibrary};
use crate::resolver::{LibraryLookup, ResolutionError};
use crate::schema::{self, SchemaError};
use crate::store::{DocumentStore, Filter, Patch, StoreError, LIBRARIES};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown equipment library: {0}")]
    UnknownLibrary(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Store(StoreError::Serialization(err))
    }
}

/// Result of merging one library into another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryMergeSummary {
    pub added: usize,
    pub unchanged: usize,
}

fn category_path(category: Category) -> String {
    format!("equipments.{}", category.as_str())
}

fn timestamp() -> Result<Value, CatalogError> {
    Ok(serde_json::to_value(Utc::now())?)
}

/// Equipment library operations on top of a [`DocumentStore`].
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create an empty library owned by `owner`.
    pub fn create_library(&self, owner: &str, name: &str) -> Result<EquipmentLibrary, CatalogError> {
        let library = EquipmentLibrary::new(generate_document_id(), owner, name);
        self.store.insert(LIBRARIES, serde_json::to_value(&library)?)?;
        info!("Created equipment library '{}' ({}) for {}", name, library.id, owner);
        Ok(library)
    }

    pub fn get_library(&self, library_id: &str) -> Result<EquipmentLibrary, CatalogError> {
        let doc = self
            .store
            .find(LIBRARIES, &Filter::by_id(library_id))?
            .ok_or_else(|| CatalogError::UnknownLibrary(library_id.to_string()))?;
        Ok(serde_json::from_value(doc)?)
    }

    pub fn list_libraries(&self, owner: &str) -> Result<Vec<EquipmentLibrary>, CatalogError> {
        self.store
            .find_all(LIBRARIES, &Filter::all().eq("user_id", owner))?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(CatalogError::from))
            .collect()
    }

    pub fn rename_library(&self, library_id: &str, name: &str) -> Result<(), CatalogError> {
        let patch = Patch::new()
            .set("library_name", name)
            .set("updated_at", timestamp()?);
        self.update_library(library_id, &patch)?;
        Ok(())
    }

    pub fn delete_library(&self, library_id: &str) -> Result<(), CatalogError> {
        if self.store.delete(LIBRARIES, &Filter::by_id(library_id))? == 0 {
            return Err(CatalogError::UnknownLibrary(library_id.to_string()));
        }
        info!("Deleted equipment library {}", library_id);
        Ok(())
    }

    /// Remove every library owned by `owner`. Returns how many were removed.
    pub fn delete_owner_libraries(&self, owner: &str) -> Result<usize, CatalogError> {
        Ok(self.store.delete(LIBRARIES, &Filter::all().eq("user_id", owner))?)
    }

    pub fn list_equipment(
        &self,
        library_id: &str,
    ) -> Result<BTreeMap<Category, Vec<Equipment>>, CatalogError> {
        Ok(self.get_library(library_id)?.equipments)
    }

    /// Validate `record` and append it to `category`.
    ///
    /// # Returns
    /// `Ok(false)` when an entry with the same `type_variety` already
    /// exists; the stored entry is left as it was.
    pub fn add(&self, library_id: &str, category: Category, record: &Value) -> Result<bool, CatalogError> {
        let equipment = Equipment::from_record(category, record)?;
        self.add_equipment(library_id, category, &equipment)
    }

    fn add_equipment(
        &self,
        library_id: &str,
        category: Category,
        equipment: &Equipment,
    ) -> Result<bool, CatalogError> {
        let patch = Patch::new()
            .push_if_absent(&category_path(category), "type_variety", equipment.to_value())
            .set("updated_at", timestamp()?);
        let added = self.update_library(library_id, &patch)?;
        if added {
            debug!("Added {} '{}' to library {}", category, equipment.type_variety, library_id);
        } else {
            debug!(
                "{} '{}' already present in library {}",
                category, equipment.type_variety, library_id
            );
        }
        Ok(added)
    }

    /// Update the entry keyed by `type_variety`.
    ///
    /// Fields present in `record` replace the stored ones, fields it omits
    /// are kept, and a `params` block replaces the stored block as a whole.
    /// The key itself cannot change: a different `type_variety` in
    /// `record` is ignored.
    ///
    /// # Returns
    /// `Ok(false)` when no such entry exists.
    pub fn update(
        &self,
        library_id: &str,
        category: Category,
        type_variety: &str,
        record: &Value,
    ) -> Result<bool, CatalogError> {
        schema::validate_equipment(category, record)?;
        let mut fields = record.as_object().cloned().unwrap_or_default();
        if let Some(requested) = fields.remove("type_variety") {
            if requested.as_str() != Some(type_variety) {
                debug!("Ignoring type_variety change for '{}'", type_variety);
            }
        }

        let patch = Patch::new()
            .merge_where(&category_path(category), "type_variety", type_variety, fields)
            .set("updated_at", timestamp()?);
        self.update_library(library_id, &patch)
    }

    /// Remove the entry keyed by `type_variety`. `Ok(false)` when absent.
    pub fn remove(&self, library_id: &str, category: Category, type_variety: &str) -> Result<bool, CatalogError> {
        let patch = Patch::new()
            .pull(&category_path(category), "type_variety", type_variety)
            .set("updated_at", timestamp()?);
        self.update_library(library_id, &patch)
    }

    pub fn find(
        &self,
        library_id: &str,
        category: Category,
        type_variety: &str,
    ) -> Result<Option<Equipment>, CatalogError> {
        Ok(self.get_library(library_id)?.find(category, type_variety).cloned())
    }

    /// Add every entry of `incoming` to `target_id`. Entries whose
    /// `type_variety` already exists in the target are left untouched.
    pub fn merge_library(
        &self,
        target_id: &str,
        incoming: &BTreeMap<Category, Vec<Equipment>>,
    ) -> Result<LibraryMergeSummary, CatalogError> {
        validate_equipments(incoming)?;
        let mut summary = LibraryMergeSummary::default();
        for (category, entries) in incoming {
            for equipment in entries {
                if self.add_equipment(target_id, *category, equipment)? {
                    summary.added += 1;
                } else {
                    summary.unchanged += 1;
                }
            }
        }
        info!(
            "Merged equipment into library {}: {} added, {} unchanged",
            target_id, summary.added, summary.unchanged
        );
        Ok(summary)
    }

    /// Apply `patch` to one library. `Ok(false)` when a conditional step
    /// had nothing to do.
    fn update_library(&self, library_id: &str, patch: &Patch) -> Result<bool, CatalogError> {
        let count = self.store.update(LIBRARIES, &Filter::by_id(library_id), patch)?;
        if count.matched == 0 {
            return Err(CatalogError::UnknownLibrary(library_id.to_string()));
        }
        Ok(count.modified > 0)
    }
}

/// Check every entry of an incoming equipment map, writing nothing.
pub fn validate_equipments(incoming: &BTreeMap<Category, Vec<Equipment>>) -> Result<(), SchemaError> {
    for (category, entries) in incoming {
        for equipment in entries {
            schema::validate_equipment(*category, &equipment.to_value())?;
        }
    }
    Ok(())
}

impl LibraryLookup for Catalog {
    fn lookup(
        &self,
        library_id: &str,
        category: Category,
        type_variety: &str,
    ) -> Result<Option<Equipment>, ResolutionError> {
        match self.find(library_id, category, type_variety) {
            Ok(found) => Ok(found),
            Err(CatalogError::UnknownLibrary(id)) => Err(ResolutionError::UnknownLibrary(id)),
            Err(err) => Err(ResolutionError::Backend(err.to_string())),
        }
    }
}
