//! Network topology service.
//!
//! Networks, their elements and connections live in the store's
//! `networks` collection. This module owns every mutation of those
//! documents and the path from a stored network to a [`TopologyGraph`].

pub mod elements;
pub mod exchange;
pub mod network;

pub use exchange::{merge_topology_fragment, ExchangedLibrary, TopologyExport};

use chrono::Utc;
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError};
use crate::config::Config;
use crate::graph::{GraphError, TopologyGraph};
use crate::model::{ConnectionId, ElementId, Network};
use crate::resolver::{LibrarySet, ResolutionError, Resolver};
use crate::schema::SchemaError;
use crate::store::{DocumentStore, Filter, MemoryStore, Patch, StoreError, NETWORKS};

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Unknown element {0}")]
    UnknownElement(ElementId),

    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("Connection endpoint {from} -> {to} is not an element of the network")]
    DanglingEndpoint { from: ElementId, to: ElementId },

    #[error("Network {0} changed while a fragment was being applied")]
    Conflict(String),

    #[error("{section} update is missing: {}", missing.join(", "))]
    IncompleteSettings {
        section: &'static str,
        missing: Vec<&'static str>,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Store(StoreError::Serialization(err))
    }
}

fn timestamp() -> Result<Value, TopologyError> {
    Ok(serde_json::to_value(Utc::now())?)
}

/// Network, element and connection operations on top of a [`DocumentStore`].
#[derive(Clone)]
pub struct TopologyService {
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
    config: Config,
}

impl TopologyService {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        let catalog = Catalog::new(Arc::clone(&store));
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Service over the in-process store, loaded from
    /// `config.store.snapshot` when one is configured. The store is returned
    /// too so the caller can save it.
    pub fn from_config(config: Config) -> crate::Result<(Self, Arc<MemoryStore>)> {
        config.validate()?;
        let store = Arc::new(match &config.store.snapshot {
            Some(path) => MemoryStore::open(path)?,
            None => MemoryStore::new(),
        });
        info!("Opened store with {} networks", store.count(NETWORKS));
        Ok((Self::new(store.clone(), config), store))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the network and the libraries it references, resolve every
    /// element and assemble the graph.
    pub fn resolve_network(&self, network_id: &str) -> Result<TopologyGraph, TopologyError> {
        let network = self.get_network(network_id)?;
        let libraries = self.load_libraries(&network)?;
        debug!(
            "Resolving network {} against {} libraries",
            network_id,
            libraries.len()
        );

        let resolver = Resolver::new(&libraries, &self.config.resolver);
        let resolved = resolver.resolve_all(&network.elements)?;
        let graph = TopologyGraph::build(resolved, &network.connections, &self.config.graph)?;
        info!(
            "Network '{}' resolved: {} elements, {} connections",
            network.network_name,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Libraries bound to the network plus any referenced by an element.
    /// Unknown ids are skipped; resolving an element against one fails.
    fn load_libraries(&self, network: &Network) -> Result<LibrarySet, TopologyError> {
        let mut ids: BTreeSet<String> = network.library_ids().into_iter().collect();
        ids.extend(network.elements.iter().filter_map(|e| e.library_id.clone()));

        let mut libraries = LibrarySet::new();
        for id in ids {
            match self.catalog.get_library(&id) {
                Ok(library) => libraries.insert(library),
                Err(CatalogError::UnknownLibrary(missing)) => {
                    debug!("Library {} referenced by network {} not found", missing, network.id)
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(libraries)
    }

    /// Remove every network and library owned by `owner`.
    ///
    /// # Returns
    /// `(networks, libraries)` removed.
    pub fn delete_owner_data(&self, owner: &str) -> Result<(usize, usize), TopologyError> {
        let networks = self.store.delete(NETWORKS, &Filter::all().eq("user_id", owner))?;
        let libraries = self.catalog.delete_owner_libraries(owner)?;
        info!(
            "Deleted data of {}: {} networks, {} libraries",
            owner, networks, libraries
        );
        Ok((networks, libraries))
    }

    /// Apply `patch` to one network, stamping `updated_at`.
    ///
    /// # Returns
    /// `Ok(false)` when a conditional step of the patch had nothing to do.
    fn update_network(
        &self,
        network_id: &str,
        filter: Filter,
        patch: Patch,
    ) -> Result<bool, TopologyError> {
        let patch = patch.set("updated_at", timestamp()?);
        let count = self.store.update(NETWORKS, &filter, &patch)?;
        if count.matched == 0 && !self.network_exists(network_id)? {
            return Err(TopologyError::UnknownNetwork(network_id.to_string()));
        }
        Ok(count.modified > 0)
    }

    fn network_exists(&self, network_id: &str) -> Result<bool, TopologyError> {
        Ok(self.store.find(NETWORKS, &Filter::by_id(network_id))?.is_some())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Category;
    use crate::store::MemoryStore;
    use serde_json::json;

    pub(crate) fn service() -> TopologyService {
        TopologyService::new(Arc::new(MemoryStore::new()), Config::default())
    }

    pub(crate) fn element(element_type: &str, name: &str) -> Value {
        json!({"type": element_type, "name": name, "metadata": {"location": {"latitude": 0, "longitude": 0}}})
    }

    #[test]
    fn test_resolve_network_end_to_end() {
        let service = service();
        let library = service.catalog().create_library("alice", "default").unwrap();
        service
            .catalog()
            .add(
                &library.id,
                Category::Fiber,
                &json!({"type_variety": "SSMF", "dispersion": 1.67e-5, "params": {"length": 80, "length_units": "km", "att_in": 0}}),
            )
            .unwrap();
        service
            .catalog()
            .add(&library.id, Category::Edfa, &json!({"type_variety": "std_medium_gain", "gain_flatmax": 26}))
            .unwrap();

        let network = service.create_network("alice", "ring").unwrap();
        service
            .set_equipment_libraries(&network.id, vec![library.id.clone()])
            .unwrap();

        let trx = service.add_element(&network.id, &element("Transceiver", "trx")).unwrap();
        let mut fiber = element("Fiber", "span");
        fiber["library_id"] = json!(library.id);
        fiber["type_variety"] = json!("SSMF");
        fiber["params"] = json!({"att_in": 2});
        let fiber = service.add_element(&network.id, &fiber).unwrap();
        let mut amp = element("Edfa", "amp");
        amp["library_id"] = json!(library.id);
        amp["type_variety"] = json!("std_medium_gain");
        let amp = service.add_element(&network.id, &amp).unwrap();

        service.add_connection(&network.id, &trx.element_id, &fiber.element_id).unwrap();
        service.add_connection(&network.id, &fiber.element_id, &amp.element_id).unwrap();

        let graph = service.resolve_network(&network.id).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.weight(&fiber.element_id, &amp.element_id), Some(80000.0));
        assert_eq!(graph.weight(&trx.element_id, &fiber.element_id), Some(0.01));
        let span = graph.node(&fiber.element_id).unwrap();
        assert_eq!(span.params.get("att_in"), Some(&json!(2)));
        assert_eq!(span.params.get("length"), Some(&json!(80)));
    }

    #[test]
    fn test_resolve_network_reference_errors() {
        let service = service();
        let network = service.create_network("alice", "broken").unwrap();
        let mut amp = element("Edfa", "amp");
        amp["library_id"] = json!("deleted");
        amp["type_variety"] = json!("x");
        service.add_element(&network.id, &amp).unwrap();

        assert!(matches!(
            service.resolve_network(&network.id),
            Err(TopologyError::Resolution(ResolutionError::UnknownLibrary(_)))
        ));
        assert!(matches!(
            service.resolve_network("missing"),
            Err(TopologyError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let snapshot = dir.path().join("store.json");
        {
            let mut config = Config::default();
            config.store.snapshot = Some(snapshot.clone());
            let (service, store) = TopologyService::from_config(config).unwrap();
            service.create_network("alice", "metro").unwrap();
            store.save(&snapshot).unwrap();
        }

        let mut config = Config::default();
        config.store.snapshot = Some(snapshot);
        let (service, _) = TopologyService::from_config(config).unwrap();
        assert_eq!(service.list_networks("alice").unwrap().len(), 1);

        let mut invalid = Config::default();
        invalid.general.log_level = " ".to_string();
        assert!(matches!(
            TopologyService::from_config(invalid),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_delete_owner_data() {
        let service = service();
        service.create_network("alice", "a").unwrap();
        service.create_network("alice", "b").unwrap();
        service.create_network("bob", "c").unwrap();
        service.catalog().create_library("alice", "lib").unwrap();

        assert_eq!(service.delete_owner_data("alice").unwrap(), (2, 1));
        assert!(service.list_networks("alice").unwrap().is_empty());
        assert_eq!(service.list_networks("bob").unwrap().len(), 1);
    }
}
