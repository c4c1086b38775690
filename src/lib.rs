//! # Optinetsim - Optical network topology and equipment library core
//!
//! This library manages optical network topologies and the per-user
//! equipment libraries their elements are built from, and turns a stored
//! network into a fully resolved directed graph ready for physical
//! simulation.
//!
//! ## Overview
//!
//! A network is a set of elements (transceivers, fiber spans, amplifiers,
//! ROADMs, ...) joined by directed connections, plus network-wide spectrum
//! (`SI`), span design (`Span`) and simulation settings. Elements usually
//! reference a template in an equipment library by `type_variety`; the
//! template's parameters are merged with the element's own overrides
//! before the graph is built.
//!
//! ## Architecture
//!
//! - `schema`: Declarative field tables and the record validator
//! - `store`: Document store contract and the in-process implementation
//! - `catalog`: Equipment libraries with unique `type_variety` per category
//! - `resolver`: Template + override parameter resolution
//! - `graph`: Directed topology graph with per-edge weights
//! - `merge`: Recursive dictionary merge and structural deduplication
//! - `topology`: Network, element and connection operations, import/export
//! - `config` / `config_loader`: YAML configuration
//! - `error`: Crate-level error aggregation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use optinetsim::{config_loader, MemoryStore, TopologyService};
//!
//! let config = config_loader::load_config("optinetsim.yaml".as_ref())?;
//! let service = TopologyService::new(Arc::new(MemoryStore::new()), config);
//!
//! let network = service.create_network("alice", "metro ring")?;
//! let graph = service.resolve_network(&network.id)?;
//! println!("{} nodes, {} edges", graph.node_count(), graph.edge_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   log_level: info
//!
//! resolver:
//!   library_optional_types: [Transceiver, Fused]
//!   default_amplifier_params:
//!     type_def: variable_gain
//!
//! graph:
//!   placeholder_weight: 0.01
//!   default_length_units: m
//!
//! store:
//!   snapshot: store.json
//! ```

pub mod catalog;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod graph;
pub mod merge;
pub mod model;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod topology;

pub use catalog::{Catalog, CatalogError};
pub use config::Config;
pub use error::{Error, Result};
pub use graph::{GraphError, TopologyGraph};
pub use merge::{dedup, merge_dicts};
pub use resolver::{LibraryLookup, LibrarySet, ResolutionError, ResolvedElement, Resolver};
pub use schema::{validate_element, validate_equipment, SchemaError};
pub use store::{DocumentStore, MemoryStore, StoreError};
pub use topology::{merge_topology_fragment, TopologyError, TopologyExport, TopologyService};
