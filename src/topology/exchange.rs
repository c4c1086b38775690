//! Topology import and export.
//!
//! A [`TopologyExport`] is both the full export of a network and the
//! fragment format accepted by [`TopologyService::import_fragment`].
//! Fragments are folded in with the semantics of
//! [`merge_topology_fragment`], so importing the same fragment twice
//! leaves the network as importing it once.

use log::{info, warn};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::network::binding_patch;
use super::{TopologyError, TopologyService};
use crate::catalog::validate_equipments;
use crate::merge::{dedup, dedup_by_value, merge_dicts};
use crate::model::ids::generate_document_id;
use crate::model::{
    Category, Connection, Element, Equipment, Network, SimulationConfig, SpanParameters,
    SpectrumInformation,
};
use crate::schema::{validate_element_record, SchemaError};
use crate::store::{Filter, Patch, NETWORKS};

/// Equipment carried alongside an exported topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangedLibrary {
    #[serde(default)]
    pub library_name: String,
    #[serde(default)]
    pub equipments: BTreeMap<Category, Vec<Equipment>>,
}

/// Exported network, or a fragment of one.
///
/// Element records are checked against the element schema as they are
/// read, before they become [`Element`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyExport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(default, deserialize_with = "validated_elements")]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub services: Vec<Value>,
    #[serde(default)]
    pub simulation_config: SimulationConfig,
    #[serde(rename = "SI", default)]
    pub si: SpectrumInformation,
    #[serde(rename = "Span", default)]
    pub span: SpanParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_library: Option<ExchangedLibrary>,
}

fn validated_elements<'de, D>(deserializer: D) -> Result<Vec<Element>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = Vec::<Value>::deserialize(deserializer)?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            validate_element_record(&record)
                .map_err(|err| D::Error::custom(format!("elements[{}]: {}", i, err)))?;
            if record.get("element_id").is_none() {
                return Err(D::Error::custom(format!(
                    "elements[{}]: {}",
                    i,
                    SchemaError::MissingField {
                        path: "element_id".to_string()
                    }
                )));
            }
            serde_json::from_value(record).map_err(D::Error::custom)
        })
        .collect()
}

/// Fold `incoming` into `existing`.
///
/// Elements, connections and services become the structural dedup of
/// `existing ++ incoming`; SI and Span are merged recursively with the
/// incoming values winning; simulation settings are replaced when the
/// fragment carries any. Library bindings are left alone.
pub fn merge_topology_fragment(
    existing: &Network,
    incoming: &TopologyExport,
) -> Result<Network, serde_json::Error> {
    let mut merged = existing.clone();

    merged.elements = dedup_by_value(
        existing
            .elements
            .iter()
            .chain(incoming.elements.iter())
            .cloned()
            .collect(),
    )?;
    merged.connections = dedup_by_value(
        existing
            .connections
            .iter()
            .chain(incoming.connections.iter())
            .cloned()
            .collect(),
    )?;
    let services: Vec<Value> = existing
        .services
        .iter()
        .chain(incoming.services.iter())
        .cloned()
        .collect();
    merged.services = dedup(&services);

    merged.si = serde_json::from_value(merge_dicts(
        &serde_json::to_value(&existing.si)?,
        &serde_json::to_value(&incoming.si)?,
    ))?;
    merged.span = serde_json::from_value(merge_dicts(
        &serde_json::to_value(&existing.span)?,
        &serde_json::to_value(&incoming.span)?,
    ))?;
    if !incoming.simulation_config.is_empty() {
        merged.simulation_config = incoming.simulation_config.clone();
    }
    Ok(merged)
}

/// Schema check of every element and equipment entry of an export.
/// Nothing is written.
fn validate_export(export: &TopologyExport) -> Result<(), TopologyError> {
    for element in &export.elements {
        validate_element_record(&serde_json::to_value(element)?)?;
    }
    if let Some(library) = &export.equipment_library {
        validate_equipments(&library.equipments)?;
    }
    Ok(())
}

/// Every connection must join two elements of the network.
fn check_endpoints(network: &Network) -> Result<(), TopologyError> {
    for connection in &network.connections {
        if !network.has_element(&connection.from_node) || !network.has_element(&connection.to_node) {
            return Err(TopologyError::DanglingEndpoint {
                from: connection.from_node.clone(),
                to: connection.to_node.clone(),
            });
        }
    }
    Ok(())
}

fn to_values<T: Serialize>(items: &[T]) -> Result<Vec<Value>, serde_json::Error> {
    items.iter().map(serde_json::to_value).collect()
}

impl TopologyService {
    /// Merge a fragment into a stored network.
    ///
    /// The fragment is checked in full before anything is written, then
    /// folded into the stored document by one store update, so element or
    /// connection changes made concurrently are kept. The fragment's
    /// equipment is merged into the network's first bound library; a
    /// network without one gets a new library bound to it.
    pub fn import_fragment(
        &self,
        network_id: &str,
        fragment: &TopologyExport,
    ) -> Result<Network, TopologyError> {
        validate_export(fragment)?;
        let network = self.get_network(network_id)?;
        check_endpoints(&merge_topology_fragment(&network, fragment)?)?;

        let mut patch = Patch::new()
            .add_each("elements", to_values(&fragment.elements)?)
            .add_each("connections", to_values(&fragment.connections)?)
            .add_each("services", fragment.services.clone())
            .merge_into("SI", serde_json::to_value(&fragment.si)?)
            .merge_into("Span", serde_json::to_value(&fragment.span)?);
        if !fragment.simulation_config.is_empty() {
            patch = patch.set("simulation_config", serde_json::to_value(&fragment.simulation_config)?);
        }

        if let Some(incoming) = &fragment.equipment_library {
            match network.library_ids().into_iter().next() {
                Some(library_id) => {
                    self.catalog.merge_library(&library_id, &incoming.equipments)?;
                }
                None => {
                    let name = if incoming.library_name.is_empty() {
                        format!("{} equipment", network.network_name)
                    } else {
                        incoming.library_name.clone()
                    };
                    let library = self.catalog.create_library(&network.user_id, &name)?;
                    self.catalog.merge_library(&library.id, &incoming.equipments)?;
                    let mut bound = network.clone();
                    bound.bind_libraries(vec![library.id]);
                    patch.ops.extend(binding_patch(&bound)?.ops);
                }
            }
        }

        let patch = patch.require_refs("connections", &["from_node", "to_node"], "elements", "element_id");
        if !self.update_network(network_id, Filter::by_id(network_id), patch)? {
            // An element was removed after the check above.
            check_endpoints(&merge_topology_fragment(&self.get_network(network_id)?, fragment)?)?;
            return Err(TopologyError::Conflict(network_id.to_string()));
        }

        let merged = self.get_network(network_id)?;
        info!(
            "Imported fragment into network {}: {} elements, {} connections",
            network_id,
            merged.elements.len(),
            merged.connections.len()
        );
        Ok(merged)
    }

    /// Export a network together with its first bound library.
    pub fn export_network(&self, network_id: &str) -> Result<TopologyExport, TopologyError> {
        let network = self.get_network(network_id)?;
        let equipment_library = match network.library_ids().into_iter().next() {
            Some(library_id) => match self.catalog.get_library(&library_id) {
                Ok(library) => Some(ExchangedLibrary {
                    library_name: library.library_name,
                    equipments: library.equipments,
                }),
                Err(crate::catalog::CatalogError::UnknownLibrary(_)) => {
                    warn!(
                        "Library {} bound to network {} no longer exists, exporting without equipment",
                        library_id, network_id
                    );
                    None
                }
                Err(err) => return Err(err.into()),
            },
            None => None,
        };

        Ok(TopologyExport {
            network_name: Some(network.network_name),
            elements: network.elements,
            connections: network.connections,
            services: network.services,
            simulation_config: network.simulation_config,
            si: network.si,
            span: network.span,
            equipment_library,
        })
    }

    /// Create a new network and library for `owner` from an export.
    ///
    /// Element and connection ids are kept. Every element bound to a
    /// library is rebound to the newly created one.
    pub fn import_network(
        &self,
        owner: &str,
        export: &TopologyExport,
    ) -> Result<Network, TopologyError> {
        let name = export
            .network_name
            .as_deref()
            .ok_or_else(|| SchemaError::MissingField {
                path: "network_name".to_string(),
            })?;
        validate_export(export)?;

        let mut network = merge_topology_fragment(
            &Network::new(generate_document_id(), owner, name),
            export,
        )?;
        check_endpoints(&network)?;

        let library_name = export
            .equipment_library
            .as_ref()
            .map(|l| l.library_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{} equipment", name));
        let library = self.catalog.create_library(owner, &library_name)?;
        if let Some(incoming) = &export.equipment_library {
            self.catalog.merge_library(&library.id, &incoming.equipments)?;
        }

        for element in &mut network.elements {
            if element.library_id.is_some() {
                element.library_id = Some(library.id.clone());
            }
        }
        network.bind_libraries(vec![library.id]);

        self.store.insert(NETWORKS, serde_json::to_value(&network)?)?;
        info!(
            "Imported network '{}' ({}) for {}: {} elements",
            name,
            network.id,
            owner,
            network.elements.len()
        );
        Ok(network)
    }
}
