//! Document model.
//!
//! Typed views of the two persisted documents (equipment libraries and
//! networks) and of the records they contain. Everything here round-trips
//! through `serde_json` in the shape the CRUD layer stores.

pub mod equipment;
pub mod ids;
pub mod network;

pub use equipment::{Category, Equipment, EquipmentLibrary};
pub use ids::{ConnectionId, ElementId};
pub use network::{
    AmplifierSpec, Connection, Element, ElementType, Network, NliParams, RamanParams,
    SimulationConfig, SpanParameters, SpectrumInformation,
};

/// JSON object type used for parameter blocks and opaque payloads.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
