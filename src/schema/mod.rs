//! Schema validation for equipment and element records.
//!
//! Each equipment category and element type is described by a static
//! [`Table`] mapping field names to expected types (see [`tables`]). One
//! generic function walks a record against its table:
//!
//! 1. every present field must be declared, else [`SchemaError::UndefinedField`];
//! 2. every present field must match its type, else [`SchemaError::TypeMismatch`];
//! 3. nested tables apply the same rules recursively, plus their required
//!    fields and "at least one of" constraints.
//!
//! Absent optional fields are never an error. Validation is pure.

pub mod tables;

use serde_json::Value;

use crate::model::{Category, ElementType};

/// Errors produced by record validation. Paths are dotted, with list
/// indices in brackets (`mode[0].penalties[1].penalty_value`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Undefined field: {path}")]
    UndefinedField { path: String },

    #[error("Invalid type for field {path}, expected {expected}")]
    TypeMismatch { path: String, expected: String },

    #[error("Missing required field: {path}")]
    MissingField { path: String },

    #[error("{path} must contain at least one of: {keys}")]
    MissingOneOf { path: String, keys: String },

    #[error("{path} must be an object")]
    NotAnObject { path: String },

    #[error("Unknown equipment category: {0}")]
    UnknownCategory(String),

    #[error("Unknown element type: {0}")]
    UnknownElementType(String),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Item type of a list field.
#[derive(Debug, Clone, Copy)]
pub enum Item {
    Any,
    Str,
    Number,
    Nested(&'static Table),
}

/// Expected type of a single field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Any JSON value, including null.
    Any,
    Str,
    /// Integer or float.
    Number,
    /// Integer, float or null.
    NullableNumber,
    Bool,
    /// Any JSON object, contents unchecked.
    Object,
    /// A string from a closed set.
    OneOf(&'static [&'static str]),
    /// An object checked against another table.
    Nested(&'static Table),
    /// Either a plain number or an object checked against a table.
    NumberOrNested(&'static Table),
    /// A number or a list of numbers.
    NumberOrList,
    List(Item),
}

impl FieldType {
    pub fn describe(&self) -> String {
        match self {
            FieldType::Any => "any value".to_string(),
            FieldType::Str => "string".to_string(),
            FieldType::Number => "number".to_string(),
            FieldType::NullableNumber => "number or null".to_string(),
            FieldType::Bool => "bool".to_string(),
            FieldType::Object => "object".to_string(),
            FieldType::OneOf(options) => format!("one of {}", options.join(", ")),
            FieldType::Nested(table) => format!("object ({})", table.name),
            FieldType::NumberOrNested(table) => format!("number or object ({})", table.name),
            FieldType::NumberOrList => "number or list of number".to_string(),
            FieldType::List(item) => match item {
                Item::Any => "list".to_string(),
                Item::Str => "list of string".to_string(),
                Item::Number => "list of number".to_string(),
                Item::Nested(table) => format!("list of object ({})", table.name),
            },
        }
    }
}

/// A declared field.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl Field {
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty, required: false }
    }

    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty, required: true }
    }
}

/// Closed set of fields of one record shape.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub fields: &'static [Field],
    /// When non-empty, at least one of these keys must be present.
    pub any_of: &'static [&'static str],
}

impl Table {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn is_number(value: &Value) -> bool {
    value.is_i64() || value.is_u64() || value.is_f64()
}

/// Validate `record` against `table`.
pub fn validate_record(table: &Table, record: &Value) -> Result<(), SchemaError> {
    validate_object(table, record, "")
}

fn validate_object(table: &Table, value: &Value, path: &str) -> Result<(), SchemaError> {
    let object = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
        path: if path.is_empty() { table.name.to_string() } else { path.to_string() },
    })?;

    for key in object.keys() {
        if table.field(key).is_none() {
            return Err(SchemaError::UndefinedField { path: join(path, key) });
        }
    }

    for (key, field_value) in object {
        if let Some(field) = table.field(key) {
            check_type(&field.ty, field_value, &join(path, key))?;
        }
    }

    for field in table.fields.iter().filter(|f| f.required) {
        if !object.contains_key(field.name) {
            return Err(SchemaError::MissingField { path: join(path, field.name) });
        }
    }

    if !table.any_of.is_empty() && !table.any_of.iter().any(|k| object.contains_key(*k)) {
        return Err(SchemaError::MissingOneOf {
            path: if path.is_empty() { table.name.to_string() } else { path.to_string() },
            keys: table.any_of.join(", "),
        });
    }

    Ok(())
}

fn check_type(ty: &FieldType, value: &Value, path: &str) -> Result<(), SchemaError> {
    let mismatch = || SchemaError::TypeMismatch {
        path: path.to_string(),
        expected: ty.describe(),
    };

    match ty {
        FieldType::Any => Ok(()),
        FieldType::Str if value.is_string() => Ok(()),
        FieldType::Number if is_number(value) => Ok(()),
        FieldType::NullableNumber if value.is_null() || is_number(value) => Ok(()),
        FieldType::Bool if value.is_boolean() => Ok(()),
        FieldType::Object if value.is_object() => Ok(()),
        FieldType::OneOf(options) => match value.as_str() {
            Some(s) if options.contains(&s) => Ok(()),
            _ => Err(mismatch()),
        },
        FieldType::Nested(table) if value.is_object() => validate_object(table, value, path),
        FieldType::NumberOrNested(_) if is_number(value) => Ok(()),
        FieldType::NumberOrNested(table) if value.is_object() => validate_object(table, value, path),
        FieldType::NumberOrList if is_number(value) => Ok(()),
        FieldType::NumberOrList if value.is_array() => {
            check_type(&FieldType::List(Item::Number), value, path)
        }
        FieldType::List(item) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            for (index, entry) in items.iter().enumerate() {
                let entry_path = format!("{}[{}]", path, index);
                check_item(item, entry, &entry_path)?;
            }
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn check_item(item: &Item, value: &Value, path: &str) -> Result<(), SchemaError> {
    match item {
        Item::Any => Ok(()),
        Item::Str => check_type(&FieldType::Str, value, path),
        Item::Number => check_type(&FieldType::Number, value, path),
        Item::Nested(table) => check_type(&FieldType::Nested(*table), value, path),
    }
}

/// Validate an equipment record of the given category.
pub fn validate_equipment(category: Category, record: &Value) -> Result<(), SchemaError> {
    validate_record(tables::equipment_table(category), record)
}

/// Validate an element record of the given type.
///
/// Only `type`, `name` and `metadata` are required. The `params`,
/// `operational` and `amplifiers` blocks are checked against the tables
/// of `element_type`; a block the type does not support is undefined.
pub fn validate_element(record: &Value, element_type: ElementType) -> Result<(), SchemaError> {
    validate_record(&tables::ELEMENT, record)?;

    if let Some(declared) = record.get("type").and_then(Value::as_str) {
        if declared != element_type.as_str() {
            return Err(SchemaError::TypeMismatch {
                path: "type".to_string(),
                expected: element_type.as_str().to_string(),
            });
        }
    }

    if let Some(params) = record.get("params") {
        validate_object(tables::element_params_table(element_type), params, "params")?;
    }

    if let Some(operational) = record.get("operational") {
        match tables::element_operational_table(element_type) {
            Some(table) => validate_object(table, operational, "operational")?,
            None => {
                return Err(SchemaError::UndefinedField {
                    path: "operational".to_string(),
                })
            }
        }
    }

    if record.get("amplifiers").is_some() && element_type != ElementType::MultibandAmplifier {
        return Err(SchemaError::UndefinedField {
            path: "amplifiers".to_string(),
        });
    }

    Ok(())
}

/// Validate an element record whose type is read from its own `type` field.
pub fn validate_element_record(record: &Value) -> Result<ElementType, SchemaError> {
    let element_type = record
        .get("type")
        .ok_or_else(|| SchemaError::MissingField { path: "type".to_string() })?
        .as_str()
        .ok_or_else(|| SchemaError::TypeMismatch {
            path: "type".to_string(),
            expected: "string".to_string(),
        })?
        .parse::<ElementType>()?;
    validate_element(record, element_type)?;
    Ok(element_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_edfa_valid_and_integer_numbers() {
        let record = json!({
            "type_variety": "std_medium_gain",
            "type_def": "variable_gain",
            "gain_flatmax": 26,
            "gain_min": 15.0,
            "p_max": 23,
            "nf_min": 6,
            "nf_max": 10,
            "out_voa_auto": false,
            "allowed_for_design": true
        });
        assert!(validate_equipment(Category::Edfa, &record).is_ok());
    }

    #[test]
    fn test_extra_field_rejected() {
        let record = json!({"type_variety": "x", "gain_flatmax": 26, "colour": "blue"});
        assert_eq!(
            validate_equipment(Category::Edfa, &record),
            Err(SchemaError::UndefinedField { path: "colour".to_string() })
        );
    }

    #[test]
    fn test_undefined_field_reported_before_type_mismatch() {
        let record = json!({"gain_flatmax": "high", "colour": "blue"});
        assert!(matches!(
            validate_equipment(Category::Edfa, &record),
            Err(SchemaError::UndefinedField { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let record = json!({"type_variety": "x", "out_voa_auto": 1});
        let err = validate_equipment(Category::Edfa, &record).unwrap_err();
        assert_eq!(
            err,
            SchemaError::TypeMismatch {
                path: "out_voa_auto".to_string(),
                expected: "bool".to_string()
            }
        );
    }

    #[test]
    fn test_fiber_nested_shapes() {
        let good = json!({
            "type_variety": "SSMF",
            "dispersion": 1.67e-05,
            "effective_area": 83e-12,
            "pmd_coef": 1.265e-15,
            "dispersion_per_frequency": {"value": [1.6e-5, 1.7e-5], "frequency": [191e12, 196e12]},
            "lumped_losses": [{"position": 10.0, "loss": 0.5}]
        });
        assert!(validate_equipment(Category::Fiber, &good).is_ok());

        let missing_frequency = json!({"dispersion_per_frequency": {"value": []}});
        assert_eq!(
            validate_equipment(Category::Fiber, &missing_frequency),
            Err(SchemaError::MissingField {
                path: "dispersion_per_frequency.frequency".to_string()
            })
        );

        let bad_loss = json!({"lumped_losses": [{"position": 10.0}]});
        assert_eq!(
            validate_equipment(Category::Fiber, &bad_loss),
            Err(SchemaError::MissingField { path: "lumped_losses[0].loss".to_string() })
        );

        let not_a_list = json!({"dispersion_per_frequency": {"value": 1, "frequency": []}});
        assert!(matches!(
            validate_equipment(Category::Fiber, &not_a_list),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_raman_pumps() {
        let good = json!({
            "type_variety": "SSMF_raman",
            "temperature": 283,
            "raman_pumps": [{"power": 0.2, "frequency": 205e12, "propagation_direction": "counterprop"}],
            "loss_coef": {"value": [0.2], "frequency": [193.5e12]}
        });
        assert!(validate_equipment(Category::RamanFiber, &good).is_ok());

        let bad_direction = json!({
            "raman_pumps": [{"power": 0.2, "frequency": 205e12, "propagation_direction": "sideways"}]
        });
        let err = validate_equipment(Category::RamanFiber, &bad_direction).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref path, .. } if path == "raman_pumps[0].propagation_direction"));

        let missing_power = json!({
            "raman_pumps": [{"frequency": 205e12, "propagation_direction": "coprop"}]
        });
        assert!(matches!(
            validate_equipment(Category::RamanFiber, &missing_power),
            Err(SchemaError::MissingField { .. })
        ));

        // Plain fibers do not know about pumps
        assert!(validate_equipment(Category::Fiber, &good).is_err());
    }

    #[test]
    fn test_roadm_restrictions() {
        let good = json!({
            "type_variety": "default",
            "target_pch_out_db": -20,
            "add_drop_osnr": 38,
            "pmd": 0,
            "pdl": 0,
            "restrictions": {"preamp_variety_list": [], "booster_variety_list": ["std_booster"]}
        });
        assert!(validate_equipment(Category::Roadm, &good).is_ok());

        let partial = json!({"restrictions": {"preamp_variety_list": []}});
        assert!(matches!(
            validate_equipment(Category::Roadm, &partial),
            Err(SchemaError::MissingField { .. })
        ));
    }

    #[test]
    fn test_transceiver_modes_and_penalties() {
        let good = json!({
            "type_variety": "vendorA_trx-type1",
            "frequency": {"min": 191.35e12, "max": 196.1e12},
            "mode": [{
                "format": "mode 1",
                "baud_rate": 32e9,
                "OSNR": 11,
                "bit_rate": 100e9,
                "roll_off": null,
                "tx_osnr": 40,
                "min_spacing": 37.5e9,
                "cost": 1,
                "penalties": [
                    {"chromatic_dispersion": 4e3, "penalty_value": 0},
                    {"pmd": 30, "penalty_value": 0.5}
                ]
            }]
        });
        assert!(validate_equipment(Category::Transceiver, &good).is_ok());

        let no_kind = json!({"mode": [{"penalties": [{"penalty_value": 1}]}]});
        assert!(matches!(
            validate_equipment(Category::Transceiver, &no_kind),
            Err(SchemaError::MissingOneOf { ref path, .. }) if path == "mode[0].penalties[0]"
        ));

        let no_value = json!({"mode": [{"penalties": [{"pdl": 1}]}]});
        assert_eq!(
            validate_equipment(Category::Transceiver, &no_value),
            Err(SchemaError::MissingField {
                path: "mode[0].penalties[0].penalty_value".to_string()
            })
        );

        let bad_frequency = json!({"frequency": {"min": "low", "max": 1}});
        assert!(validate_equipment(Category::Transceiver, &bad_frequency).is_err());

        let unknown_mode_field = json!({"mode": [{"speed": 1}]});
        assert_eq!(
            validate_equipment(Category::Transceiver, &unknown_mode_field),
            Err(SchemaError::UndefinedField { path: "mode[0].speed".to_string() })
        );
    }

    #[test]
    fn test_template_params_use_element_table() {
        let good = json!({"type_variety": "SSMF", "params": {"length": 80000, "att_in": 0}});
        assert!(validate_equipment(Category::Fiber, &good).is_ok());

        let bad = json!({"type_variety": "SSMF", "params": {"gain_target": 20}});
        assert_eq!(
            validate_equipment(Category::Fiber, &bad),
            Err(SchemaError::UndefinedField { path: "params.gain_target".to_string() })
        );
    }

    #[test]
    fn test_edfa_template_model_fields() {
        let template = json!({
            "type_variety": "openroadm_ila",
            "params": {
                "type_def": "openroadm",
                "nf_coef": [8.1e-4, 6.142e-2, 1.558, 19.97],
                "nf_fit_coeff": [0.0, 0.0, 0.0],
                "dgt": [1.0, 1.02, 1.04],
                "gain_ripple": [0.0, 0.01],
                "tilt_ripple": 0,
                "nf_ripple": [0.0, 0.0],
                "f_ripple_ref": [191.3e12, 196.1e12],
                "pmd": 0,
                "pdl": 0.5,
                "preamp_variety": "pre",
                "booster_variety": "boost"
            }
        });
        assert!(validate_equipment(Category::Edfa, &template).is_ok());

        let bad = json!({"type_variety": "x", "params": {"gain_ripple": ["flat"]}});
        assert_eq!(
            validate_equipment(Category::Edfa, &bad),
            Err(SchemaError::TypeMismatch {
                path: "params.gain_ripple[0]".to_string(),
                expected: "number".to_string(),
            })
        );
        let bad = json!({"type_variety": "x", "params": {"pmd": "low"}});
        assert!(matches!(
            validate_equipment(Category::Edfa, &bad),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_element_required_fields() {
        let record = json!({"type": "Edfa", "name": "amp"});
        assert_eq!(
            validate_element(&record, ElementType::Edfa),
            Err(SchemaError::MissingField { path: "metadata".to_string() })
        );

        let record = json!({
            "type": "Edfa",
            "name": "amp",
            "metadata": {"location": {"latitude": 0, "longitude": 0}},
            "library_id": "lib",
            "type_variety": "std_medium_gain",
            "operational": {"gain_target": 19, "tilt_target": 0, "out_voa": 0}
        });
        assert!(validate_element(&record, ElementType::Edfa).is_ok());
        assert_eq!(validate_element_record(&record), Ok(ElementType::Edfa));
    }

    #[test]
    fn test_element_type_must_match() {
        let record = json!({"type": "Fiber", "name": "f", "metadata": {}});
        assert!(matches!(
            validate_element(&record, ElementType::Edfa),
            Err(SchemaError::TypeMismatch { ref path, .. }) if path == "type"
        ));
        let unknown = json!({"type": "Laser", "name": "l", "metadata": {}});
        assert!(matches!(
            validate_element_record(&unknown),
            Err(SchemaError::UnknownElementType(_))
        ));
    }

    #[test]
    fn test_element_blocks_depend_on_type() {
        let fiber = json!({
            "type": "Fiber",
            "name": "span",
            "metadata": {},
            "params": {"length": 80, "length_units": "km", "loss_coef": 0.2, "con_in": 0.5}
        });
        assert!(validate_element(&fiber, ElementType::Fiber).is_ok());

        let fiber_with_operational = json!({
            "type": "Fiber", "name": "span", "metadata": {}, "operational": {}
        });
        assert_eq!(
            validate_element(&fiber_with_operational, ElementType::Fiber),
            Err(SchemaError::UndefinedField { path: "operational".to_string() })
        );

        let bad_units = json!({
            "type": "Fiber", "name": "span", "metadata": {}, "params": {"length_units": "mi"}
        });
        assert!(validate_element(&bad_units, ElementType::Fiber).is_err());

        let edfa_amplifiers = json!({
            "type": "Edfa", "name": "amp", "metadata": {}, "amplifiers": []
        });
        assert!(validate_element(&edfa_amplifiers, ElementType::Edfa).is_err());

        let multiband = json!({
            "type": "Multiband_amplifier",
            "name": "mb",
            "metadata": {},
            "amplifiers": [{"type_variety": "std_low_gain_C", "operational": {"gain_target": 18}}]
        });
        assert!(validate_element(&multiband, ElementType::MultibandAmplifier).is_ok());
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            validate_equipment(Category::Roadm, &json!([1, 2])),
            Err(SchemaError::NotAnObject { .. })
        ));
    }
}
