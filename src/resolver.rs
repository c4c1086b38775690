//! Parameter resolution.
//!
//! An element that references a library template gets the template's
//! `params` as its base, with the element's own `params` layered on top.
//! The output carries no library reference: it is everything the
//! simulation engine needs to build the element.

use log::{debug, trace};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::ResolverConfig;
use crate::merge::overlay_params;
use crate::model::{
    AmplifierSpec, Category, Element, ElementId, ElementType, Equipment, EquipmentLibrary, JsonMap,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Unknown equipment library: {0}")]
    UnknownLibrary(String),

    #[error("{category} '{type_variety}' not found in library {library_id}")]
    UnknownTypeVariety {
        library_id: String,
        category: Category,
        type_variety: String,
    },

    #[error("{element_type} element {element_id} has no library_id")]
    MissingLibrary {
        element_id: ElementId,
        element_type: ElementType,
    },

    #[error("{element_type} element {element_id} does not have a type_variety")]
    MissingTypeVariety {
        element_id: ElementId,
        element_type: ElementType,
    },

    #[error("Library lookup failed: {0}")]
    Backend(String),
}

/// Source of equipment templates keyed by `(library_id, category, type_variety)`.
pub trait LibraryLookup: Sync {
    /// `Ok(None)` when the library exists but has no such entry;
    /// `Err(UnknownLibrary)` when the library itself is missing.
    fn lookup(
        &self,
        library_id: &str,
        category: Category,
        type_variety: &str,
    ) -> Result<Option<Equipment>, ResolutionError>;
}

/// Libraries already loaded in memory.
#[derive(Debug, Clone, Default)]
pub struct LibrarySet {
    libraries: HashMap<String, EquipmentLibrary>,
}

impl LibrarySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, library: EquipmentLibrary) {
        self.libraries.insert(library.id.clone(), library);
    }

    pub fn get(&self, library_id: &str) -> Option<&EquipmentLibrary> {
        self.libraries.get(library_id)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl FromIterator<EquipmentLibrary> for LibrarySet {
    fn from_iter<I: IntoIterator<Item = EquipmentLibrary>>(iter: I) -> Self {
        let mut set = LibrarySet::new();
        for library in iter {
            set.insert(library);
        }
        set
    }
}

impl LibraryLookup for LibrarySet {
    fn lookup(
        &self,
        library_id: &str,
        category: Category,
        type_variety: &str,
    ) -> Result<Option<Equipment>, ResolutionError> {
        let library = self
            .get(library_id)
            .ok_or_else(|| ResolutionError::UnknownLibrary(library_id.to_string()))?;
        Ok(library.find(category, type_variety).cloned())
    }
}

/// One sub-amplifier of a resolved multiband amplifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAmplifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_variety: Option<String>,
    pub params: JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational: Option<JsonMap>,
}

/// An element with its template merged in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedElement {
    pub element_id: ElementId,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub name: String,
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_variety: Option<String>,
    pub params: JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational: Option<JsonMap>,
    /// Template record the element was resolved against, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Equipment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub amplifiers: Vec<ResolvedAmplifier>,
}

impl ResolvedElement {
    fn unbound(element: &Element) -> Self {
        Self {
            element_id: element.element_id.clone(),
            element_type: element.element_type,
            name: element.name.clone(),
            metadata: element.metadata.clone(),
            type_variety: element.type_variety.clone(),
            params: element.params.clone(),
            operational: element.operational.clone(),
            equipment: None,
            amplifiers: element
                .amplifiers
                .iter()
                .map(|amp| ResolvedAmplifier {
                    type_variety: amp.type_variety.clone(),
                    params: amp.params.clone(),
                    operational: amp.operational.clone(),
                })
                .collect(),
        }
    }
}

/// Resolves elements against a [`LibraryLookup`].
pub struct Resolver<'a, L: LibraryLookup + ?Sized> {
    lookup: &'a L,
    policy: &'a ResolverConfig,
}

impl<'a, L: LibraryLookup + ?Sized> Resolver<'a, L> {
    pub fn new(lookup: &'a L, policy: &'a ResolverConfig) -> Self {
        Self { lookup, policy }
    }

    /// Resolve one element.
    ///
    /// # Arguments
    /// * `element` - Stored element, possibly bound to a library template
    ///
    /// # Returns
    /// The element with template and override params merged, or the
    /// first reference error encountered.
    pub fn resolve(&self, element: &Element) -> Result<ResolvedElement, ResolutionError> {
        let optional = self.policy.is_library_optional(element.element_type);

        let library_id = match &element.library_id {
            Some(id) => id,
            None if optional => {
                trace!("{} {} resolved without library", element.element_type, element.element_id);
                return Ok(ResolvedElement::unbound(element));
            }
            None => {
                return Err(ResolutionError::MissingLibrary {
                    element_id: element.element_id.clone(),
                    element_type: element.element_type,
                })
            }
        };

        let type_variety = match &element.type_variety {
            Some(tv) => tv,
            None if optional => return Ok(ResolvedElement::unbound(element)),
            None => {
                return Err(ResolutionError::MissingTypeVariety {
                    element_id: element.element_id.clone(),
                    element_type: element.element_type,
                })
            }
        };

        let template = self.template(library_id, element.element_type, type_variety)?;
        let mut resolved = ResolvedElement::unbound(element);
        resolved.params = overlay_params(&template.params, &element.params);

        if element.element_type == ElementType::MultibandAmplifier {
            resolved.amplifiers = self.resolve_amplifiers(library_id, &template, &element.amplifiers)?;
        }

        resolved.equipment = Some(template);
        Ok(resolved)
    }

    /// Resolve every element in parallel.
    ///
    /// # Returns
    /// The resolved elements in input order, or the error of the first
    /// failing element in input order.
    pub fn resolve_all(&self, elements: &[Element]) -> Result<Vec<ResolvedElement>, ResolutionError> {
        let results: Vec<Result<ResolvedElement, ResolutionError>> =
            elements.par_iter().map(|element| self.resolve(element)).collect();
        let resolved = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        debug!("Resolved {} elements", resolved.len());
        Ok(resolved)
    }

    fn template(
        &self,
        library_id: &str,
        element_type: ElementType,
        type_variety: &str,
    ) -> Result<Equipment, ResolutionError> {
        let category = element_type.category();
        if let Some(found) = self.lookup.lookup(library_id, category, type_variety)? {
            return Ok(found);
        }
        if element_type == ElementType::RamanFiber {
            if let Some(found) = self.lookup.lookup(library_id, Category::Fiber, type_variety)? {
                debug!("RamanFiber '{}' resolved from Fiber category", type_variety);
                return Ok(found);
            }
        }
        Err(ResolutionError::UnknownTypeVariety {
            library_id: library_id.to_string(),
            category,
            type_variety: type_variety.to_string(),
        })
    }

    fn resolve_amplifiers(
        &self,
        library_id: &str,
        template: &Equipment,
        listed: &[AmplifierSpec],
    ) -> Result<Vec<ResolvedAmplifier>, ResolutionError> {
        if listed.is_empty() {
            return Ok(self.band_stubs(template));
        }

        listed
            .iter()
            .map(|amp| {
                let params = match &amp.type_variety {
                    Some(tv) => {
                        let edfa = self.template(library_id, ElementType::Edfa, tv)?;
                        overlay_params(&edfa.params, &amp.params)
                    }
                    None => amp.params.clone(),
                };
                Ok(ResolvedAmplifier {
                    type_variety: amp.type_variety.clone(),
                    params,
                    operational: amp.operational.clone(),
                })
            })
            .collect()
    }

    /// One default amplifier per band of the multiband template.
    fn band_stubs(&self, template: &Equipment) -> Vec<ResolvedAmplifier> {
        let bands = template
            .fields
            .get("bands")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        bands
            .iter()
            .map(|band| {
                let mut params = self.policy.default_amplifier_params.clone();
                for key in ["f_min", "f_max"] {
                    if let Some(value) = band.get(key) {
                        params.insert(key.to_string(), value.clone());
                    }
                }
                ResolvedAmplifier {
                    type_variety: None,
                    params,
                    operational: None,
                }
            })
            .collect()
    }
}
