//! Network documents: elements, connections and network-wide settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::equipment::Category;
use super::ids::{ConnectionId, ElementId};
use super::JsonMap;
use crate::schema::SchemaError;

/// Discriminant of a topology element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Transceiver,
    Fiber,
    RamanFiber,
    Edfa,
    Roadm,
    #[serde(rename = "Multiband_amplifier")]
    MultibandAmplifier,
    Fused,
}

impl ElementType {
    pub const ALL: [ElementType; 7] = [
        ElementType::Transceiver,
        ElementType::Fiber,
        ElementType::RamanFiber,
        ElementType::Edfa,
        ElementType::Roadm,
        ElementType::MultibandAmplifier,
        ElementType::Fused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Transceiver => "Transceiver",
            ElementType::Fiber => "Fiber",
            ElementType::RamanFiber => "RamanFiber",
            ElementType::Edfa => "Edfa",
            ElementType::Roadm => "Roadm",
            ElementType::MultibandAmplifier => "Multiband_amplifier",
            ElementType::Fused => "Fused",
        }
    }

    /// Library category an element of this type is resolved against.
    pub fn category(&self) -> Category {
        match self {
            ElementType::Transceiver => Category::Transceiver,
            ElementType::Fiber => Category::Fiber,
            ElementType::RamanFiber => Category::RamanFiber,
            ElementType::Edfa => Category::Edfa,
            ElementType::Roadm => Category::Roadm,
            ElementType::MultibandAmplifier => Category::MultibandAmplifier,
            ElementType::Fused => Category::Fused,
        }
    }

    /// Fiber spans carry a physical length that becomes the edge weight.
    pub fn is_fiber(&self) -> bool {
        matches!(self, ElementType::Fiber | ElementType::RamanFiber)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownElementType(s.to_string()))
    }
}

/// Sub-amplifier entry of a multiband amplifier element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AmplifierSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_variety: Option<String>,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub params: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational: Option<JsonMap>,
}

/// One node of a network topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub element_id: ElementId,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub name: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_variety: Option<String>,
    #[serde(default)]
    pub params: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amplifiers: Vec<AmplifierSpec>,
}

impl Element {
    pub fn new(element_type: ElementType, name: impl Into<String>) -> Self {
        Self {
            element_id: ElementId::generate(),
            element_type,
            name: name.into(),
            metadata: Value::Object(JsonMap::new()),
            library_id: None,
            type_variety: None,
            params: JsonMap::new(),
            operational: None,
            amplifiers: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.element_id = id.into();
        self
    }

    pub fn with_library(mut self, library_id: &str, type_variety: &str) -> Self {
        self.library_id = Some(library_id.to_string());
        self.type_variety = Some(type_variety.to_string());
        self
    }

    pub fn with_params(mut self, params: JsonMap) -> Self {
        self.params = params;
        self
    }
}

/// Directed link between two elements of the same network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub from_node: ElementId,
    pub to_node: ElementId,
}

impl Connection {
    pub fn new(from_node: impl Into<ElementId>, to_node: impl Into<ElementId>) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            from_node: from_node.into(),
            to_node: to_node.into(),
        }
    }
}

/// Spectrum information (`SI`) shared by every channel of a network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_dbm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_range_db: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_off: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_osnr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_margins: Option<f64>,
}

impl SpectrumInformation {
    /// Names of the fields a complete SI update must carry but this one lacks.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let checks = [
            ("f_min", self.f_min.is_some()),
            ("f_max", self.f_max.is_some()),
            ("baud_rate", self.baud_rate.is_some()),
            ("spacing", self.spacing.is_some()),
            ("power_dbm", self.power_dbm.is_some()),
            ("power_range_db", self.power_range_db.is_some()),
            ("roll_off", self.roll_off.is_some()),
            ("tx_osnr", self.tx_osnr.is_some()),
            ("sys_margins", self.sys_margins.is_some()),
        ];
        checks.iter().filter(|(_, present)| !present).map(|(name, _)| *name).collect()
    }
}

/// Span design parameters (`Span`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_power_range_db: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fiber_lineic_loss_for_raman: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_extended_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(rename = "EOL", default, skip_serializing_if = "Option::is_none")]
    pub eol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub con_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub con_out: Option<f64>,
}

impl SpanParameters {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let checks = [
            ("power_mode", self.power_mode.is_some()),
            ("delta_power_range_db", self.delta_power_range_db.is_some()),
            ("max_fiber_lineic_loss_for_raman", self.max_fiber_lineic_loss_for_raman.is_some()),
            ("target_extended_gain", self.target_extended_gain.is_some()),
            ("max_length", self.max_length.is_some()),
            ("length_units", self.length_units.is_some()),
            ("max_loss", self.max_loss.is_some()),
            ("padding", self.padding.is_some()),
            ("EOL", self.eol.is_some()),
            ("con_in", self.con_in.is_some()),
            ("con_out", self.con_out.is_some()),
        ];
        checks.iter().filter(|(_, present)| !present).map(|(name, _)| *name).collect()
    }
}

/// Raman solver settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RamanParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_spatial_resolution: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_spatial_resolution: Option<f64>,
}

/// Non-linear interference solver settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NliParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispersion_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_shift_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_channels: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_number_of_channels: Option<u32>,
}

/// Simulation settings forwarded to the simulation engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raman_params: Option<RamanParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nli_params: Option<NliParams>,
}

impl SimulationConfig {
    pub fn is_empty(&self) -> bool {
        self.raman_params.is_none() && self.nli_params.is_none()
    }
}

/// A stored network topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub network_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub services: Vec<Value>,
    #[serde(rename = "SI", default)]
    pub si: SpectrumInformation,
    #[serde(rename = "Span", default)]
    pub span: SpanParameters,
    #[serde(default)]
    pub simulation_config: SimulationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_library_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_library_ids: Option<Vec<String>>,
}

impl Network {
    pub fn new(id: String, user_id: &str, network_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: user_id.to_string(),
            network_name: network_name.to_string(),
            created_at: now,
            updated_at: now,
            elements: Vec::new(),
            connections: Vec::new(),
            services: Vec::new(),
            si: SpectrumInformation::default(),
            span: SpanParameters::default(),
            simulation_config: SimulationConfig::default(),
            equipment_library_id: None,
            equipment_library_ids: None,
        }
    }

    /// Library ids bound to this network, whichever form is stored.
    pub fn library_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.equipment_library_id.iter().cloned().collect();
        for id in self.equipment_library_ids.iter().flatten() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Bind libraries, storing one id as `equipment_library_id` and several
    /// as `equipment_library_ids`.
    pub fn bind_libraries(&mut self, ids: Vec<String>) {
        self.equipment_library_id = None;
        self.equipment_library_ids = None;
        match ids.len() {
            0 => {}
            1 => self.equipment_library_id = ids.into_iter().next(),
            _ => self.equipment_library_ids = Some(ids),
        }
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.element_id == id)
    }

    pub fn has_element(&self, id: &ElementId) -> bool {
        self.element(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_type_round_trip() {
        for t in ElementType::ALL {
            assert_eq!(t.as_str().parse::<ElementType>().unwrap(), t);
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
        assert!("Laser".parse::<ElementType>().is_err());
        assert_eq!(ElementType::RamanFiber.category(), Category::RamanFiber);
        assert!(ElementType::RamanFiber.is_fiber());
        assert!(!ElementType::Edfa.is_fiber());
    }

    #[test]
    fn test_element_persisted_shape() {
        let element = Element::new(ElementType::Fiber, "span 1")
            .with_id("e1")
            .with_library("lib", "SSMF");
        let doc = serde_json::to_value(&element).unwrap();
        assert_eq!(doc["element_id"], json!("e1"));
        assert_eq!(doc["type"], json!("Fiber"));
        assert_eq!(doc["library_id"], json!("lib"));
        assert_eq!(doc["params"], json!({}));
        assert!(doc.get("amplifiers").is_none());
    }

    #[test]
    fn test_empty_settings_serialize_as_empty_objects() {
        let network = Network::new("n1".into(), "u1", "net");
        let doc = serde_json::to_value(&network).unwrap();
        assert_eq!(doc["SI"], json!({}));
        assert_eq!(doc["Span"], json!({}));
        assert_eq!(doc["simulation_config"], json!({}));
        assert!(doc.get("equipment_library_id").is_none());
    }

    #[test]
    fn test_missing_fields() {
        let si = SpectrumInformation {
            f_min: Some(191.3e12),
            ..Default::default()
        };
        let missing = si.missing_fields();
        assert!(!missing.contains(&"f_min"));
        assert!(missing.contains(&"sys_margins"));
        assert_eq!(SpanParameters::default().missing_fields().len(), 11);
    }

    #[test]
    fn test_library_binding_forms() {
        let mut network = Network::new("n1".into(), "u1", "net");
        network.bind_libraries(vec!["a".into()]);
        assert_eq!(network.equipment_library_id.as_deref(), Some("a"));
        assert_eq!(network.library_ids(), vec!["a".to_string()]);

        network.bind_libraries(vec!["a".into(), "b".into()]);
        assert!(network.equipment_library_id.is_none());
        assert_eq!(network.library_ids().len(), 2);
    }
}
