use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::graph::LengthUnit;
use crate::model::{ElementType, JsonMap};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.log_level.trim().is_empty() {
            return Err(ConfigError::InvalidGeneral(
                "log_level cannot be empty".to_string(),
            ));
        }

        let mut seen = Vec::new();
        for element_type in &self.resolver.library_optional_types {
            if seen.contains(element_type) {
                return Err(ConfigError::InvalidResolver(format!(
                    "{} listed twice in library_optional_types",
                    element_type
                )));
            }
            seen.push(*element_type);
        }

        if !(self.graph.placeholder_weight.is_finite() && self.graph.placeholder_weight > 0.0) {
            return Err(ConfigError::InvalidGraph(format!(
                "placeholder_weight must be a positive number, got {}",
                self.graph.placeholder_weight
            )));
        }

        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parameter resolution policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Element types that may be resolved without a library reference
    #[serde(default = "default_library_optional_types")]
    pub library_optional_types: Vec<ElementType>,
    /// Parameters of the per-band amplifiers synthesized for a multiband
    /// amplifier that lists none
    #[serde(default = "default_amplifier_params")]
    pub default_amplifier_params: JsonMap,
}

impl ResolverConfig {
    pub fn is_library_optional(&self, element_type: ElementType) -> bool {
        self.library_optional_types.contains(&element_type)
    }
}

fn default_library_optional_types() -> Vec<ElementType> {
    vec![ElementType::Transceiver, ElementType::Fused]
}

fn default_amplifier_params() -> JsonMap {
    let mut params = JsonMap::new();
    params.insert("type_def".to_string(), Value::String("variable_gain".to_string()));
    params
}

/// Graph assembly settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Weight of edges leaving a non-fiber element
    #[serde(default = "default_placeholder_weight")]
    pub placeholder_weight: f64,
    /// Unit of fiber `length` params that carry no `length_units`
    #[serde(default)]
    pub default_length_units: LengthUnit,
}

fn default_placeholder_weight() -> f64 {
    0.01
}

/// Document store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot loaded at startup and written back after changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid resolver configuration: {0}")]
    InvalidResolver(String),
    #[error("Invalid graph configuration: {0}")]
    InvalidGraph(String),
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            library_optional_types: default_library_optional_types(),
            default_amplifier_params: default_amplifier_params(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            placeholder_weight: default_placeholder_weight(),
            default_length_units: LengthUnit::default(),
        }
    }
}
