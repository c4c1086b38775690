//! Equipment library documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::JsonMap;
use crate::schema::SchemaError;

/// Equipment categories of a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Edfa,
    Fiber,
    RamanFiber,
    Roadm,
    Transceiver,
    #[serde(rename = "Multiband_amplifier")]
    MultibandAmplifier,
    Fused,
}

impl Category {
    /// Every known category.
    pub const ALL: [Category; 7] = [
        Category::Edfa,
        Category::Fiber,
        Category::RamanFiber,
        Category::Roadm,
        Category::Transceiver,
        Category::MultibandAmplifier,
        Category::Fused,
    ];

    /// Categories present (empty) in every newly created library.
    pub const CORE: [Category; 5] = [
        Category::Edfa,
        Category::Fiber,
        Category::RamanFiber,
        Category::Roadm,
        Category::Transceiver,
    ];

    /// Name used as the key under `equipments` in a library document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Edfa => "Edfa",
            Category::Fiber => "Fiber",
            Category::RamanFiber => "RamanFiber",
            Category::Roadm => "Roadm",
            Category::Transceiver => "Transceiver",
            Category::MultibandAmplifier => "Multiband_amplifier",
            Category::Fused => "Fused",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownCategory(s.to_string()))
    }
}

/// One device template inside a library category.
///
/// `type_variety` is the catalog key. `params` is the template parameter
/// block merged into elements that reference this entry; every other
/// category field lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub type_variety: String,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub params: JsonMap,
    #[serde(flatten)]
    pub fields: JsonMap,
}

impl Equipment {
    pub fn new(type_variety: impl Into<String>) -> Self {
        Self {
            type_variety: type_variety.into(),
            params: JsonMap::new(),
            fields: JsonMap::new(),
        }
    }

    pub fn with_params(mut self, params: JsonMap) -> Self {
        self.params = params;
        self
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Validate a raw record against the category table and convert it.
    pub fn from_record(category: Category, record: &Value) -> Result<Self, SchemaError> {
        crate::schema::validate_equipment(category, record)?;
        let type_variety = record.get("type_variety").and_then(Value::as_str);
        if type_variety.is_none() {
            return Err(SchemaError::MissingField {
                path: "type_variety".to_string(),
            });
        }
        serde_json::from_value(record.clone()).map_err(|e| SchemaError::Malformed(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        let mut record = self.fields.clone();
        record.insert("type_variety".to_string(), Value::String(self.type_variety.clone()));
        if !self.params.is_empty() {
            record.insert("params".to_string(), Value::Object(self.params.clone()));
        }
        Value::Object(record)
    }
}

/// Per-owner catalog of device templates grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentLibrary {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub library_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub equipments: BTreeMap<Category, Vec<Equipment>>,
}

impl EquipmentLibrary {
    /// A new, empty library with the core categories present.
    pub fn new(id: String, user_id: &str, library_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: user_id.to_string(),
            library_name: library_name.to_string(),
            created_at: now,
            updated_at: now,
            equipments: Category::CORE.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    pub fn find(&self, category: Category, type_variety: &str) -> Option<&Equipment> {
        self.equipments
            .get(&category)
            .and_then(|list| list.iter().find(|e| e.type_variety == type_variety))
    }

    /// Total number of equipment entries across categories.
    pub fn len(&self) -> usize {
        self.equipments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::MultibandAmplifier.as_str(), "Multiband_amplifier");
        assert_eq!("RamanFiber".parse::<Category>().unwrap(), Category::RamanFiber);
        assert!("Laser".parse::<Category>().is_err());
        assert_eq!(
            serde_json::to_value(Category::MultibandAmplifier).unwrap(),
            json!("Multiband_amplifier")
        );
    }

    #[test]
    fn test_equipment_flattens_fields() {
        let record = json!({
            "type_variety": "std_medium_gain",
            "gain_flatmax": 26,
            "out_voa_auto": false,
            "params": {"f_min": 191.3e12}
        });
        let eqpt = Equipment::from_record(Category::Edfa, &record).unwrap();
        assert_eq!(eqpt.type_variety, "std_medium_gain");
        assert_eq!(eqpt.fields.get("gain_flatmax"), Some(&json!(26)));
        assert!(!eqpt.fields.contains_key("params"));
        assert_eq!(eqpt.to_value(), record);
    }

    #[test]
    fn test_equipment_requires_type_variety() {
        let record = json!({"gain_flatmax": 26});
        assert!(matches!(
            Equipment::from_record(Category::Edfa, &record),
            Err(SchemaError::MissingField { .. })
        ));
    }

    #[test]
    fn test_new_library_has_core_categories() {
        let lib = EquipmentLibrary::new("lib".into(), "user", "default");
        assert_eq!(lib.equipments.len(), 5);
        assert!(lib.equipments.contains_key(&Category::Roadm));
        assert!(!lib.equipments.contains_key(&Category::Fused));
        assert!(lib.is_empty());

        let doc = serde_json::to_value(&lib).unwrap();
        assert!(doc["equipments"]["Edfa"].as_array().unwrap().is_empty());
        assert_eq!(doc["_id"], json!("lib"));
    }
}
