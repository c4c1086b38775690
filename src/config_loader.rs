use crate::config::{Config, ConfigError};
use log::{debug, info};
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)?;
    let config: Config = serde_yaml::from_reader(file)?;

    config.validate()?;
    debug!("Configuration: {:?}", config);

    Ok(config)
}

/// Load `config_path` when given, otherwise fall back to the defaults
pub fn load_or_default(config_path: Option<&Path>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// Command-line settings that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub snapshot: Option<std::path::PathBuf>,
}

/// Apply CLI overrides to a loaded configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<(), ConfigError> {
    if let Some(level) = &overrides.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(snapshot) = &overrides.snapshot {
        config.store.snapshot = Some(snapshot.clone());
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LengthUnit;
    use crate::model::ElementType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
general:
  log_level: "debug"
resolver:
  library_optional_types: ["Transceiver", "Fused", "Roadm"]
  default_amplifier_params:
    type_def: "fixed_gain"
    gain_flatmax: 21
graph:
  placeholder_weight: 0.5
  default_length_units: "km"
store:
  snapshot: "/tmp/optinetsim.json"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(config.resolver.is_library_optional(ElementType::Roadm));
        assert_eq!(
            config.resolver.default_amplifier_params.get("gain_flatmax"),
            Some(&serde_json::json!(21))
        );
        assert_eq!(config.graph.placeholder_weight, 0.5);
        assert_eq!(config.graph.default_length_units, LengthUnit::Kilometers);
        assert!(config.store.snapshot.is_some());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "graph:\n  placeholder_weight: 1.0\n").unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.graph.default_length_units, LengthUnit::Meters);
        assert!(config.resolver.is_library_optional(ElementType::Transceiver));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "graph:\n  placeholder_weight: -1\n").unwrap();
        assert!(matches!(
            load_config(temp_file.path()),
            Err(ConfigError::InvalidGraph(_))
        ));

        let mut bad_unit = NamedTempFile::new().unwrap();
        write!(bad_unit, "graph:\n  default_length_units: \"mi\"\n").unwrap();
        assert!(matches!(load_config(bad_unit.path()), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/optinetsim.yaml")),
            Err(ConfigError::Io(_))
        ));
        assert_eq!(load_or_default(None).unwrap(), Config::default());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            log_level: Some("trace".to_string()),
            snapshot: Some("store.json".into()),
        };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.general.log_level, "trace");
        assert_eq!(config.store.snapshot, Some("store.json".into()));
    }
}
