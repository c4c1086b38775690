use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use optinetsim::config_loader::{self, CliOverrides};
use optinetsim::model::Category;
use optinetsim::{schema, TopologyExport, TopologyService};

/// Optical network topology and equipment library tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// JSON store snapshot, overrides `store.snapshot`
    #[arg(long)]
    store: Option<PathBuf>,

    /// Number of resolver threads (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate equipment or element records from a JSON file
    Validate {
        /// File holding one record or an array of records
        file: PathBuf,

        /// Validate as equipment of this category instead of as elements
        #[arg(long)]
        category: Option<String>,
    },

    /// Create a network (and its library) from an exported topology
    Import {
        file: PathBuf,

        /// Owner of the new network and library
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Merge a topology fragment into an existing network
    Merge { network_id: String, file: PathBuf },

    /// Export a network and its equipment library
    Export {
        network_id: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a network and write its topology graph
    Resolve {
        network_id: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut config = config_loader::load_or_default(args.config.as_deref())
        .wrap_err("Failed to load configuration")?;
    config_loader::apply_overrides(
        &mut config,
        &CliOverrides {
            log_level: args.log_level.clone(),
            snapshot: args.store.clone(),
        },
    )?;

    env_logger::Builder::from_env(Env::default().default_filter_or(config.general.log_level.as_str()))
        .init();

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .wrap_err("Failed to configure thread pool")?;
    }

    let snapshot = config.store.snapshot.clone();
    let (service, store) =
        TopologyService::from_config(config).wrap_err("Failed to open the store")?;

    let modified = match args.command {
        Command::Validate { file, category } => {
            validate_file(&file, category.as_deref())?;
            false
        }
        Command::Import { file, owner } => {
            let export: TopologyExport = read_json(&file)?;
            let network = service.import_network(&owner, &export)?;
            println!("{}", network.id);
            true
        }
        Command::Merge { network_id, file } => {
            let fragment: TopologyExport = read_json(&file)?;
            let network = service.import_fragment(&network_id, &fragment)?;
            info!(
                "Network {} now has {} elements and {} connections",
                network.id,
                network.elements.len(),
                network.connections.len()
            );
            true
        }
        Command::Export { network_id, output } => {
            let export = service.export_network(&network_id)?;
            write_json(&export, output.as_deref())?;
            false
        }
        Command::Resolve { network_id, output } => {
            let graph = service.resolve_network(&network_id)?;
            write_json(&graph.export(), output.as_deref())?;
            false
        }
    };

    if modified {
        match &snapshot {
            Some(path) => store
                .save(path)
                .wrap_err_with(|| format!("Failed to save store snapshot '{}'", path.display()))?,
            None => warn!("No store snapshot configured, changes are not persisted"),
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&contents).wrap_err_with(|| format!("Failed to parse '{}'", path.display()))
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
            info!("Wrote {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Validate every record in `file`, reporting each failure.
fn validate_file(file: &Path, category: Option<&str>) -> Result<()> {
    let category: Option<Category> = category.map(str::parse::<Category>).transpose()?;
    let records = match read_json::<Value>(file)? {
        Value::Array(items) => items,
        single => vec![single],
    };

    let mut failures = 0;
    for (i, record) in records.iter().enumerate() {
        let outcome = match category {
            Some(category) => schema::validate_equipment(category, record),
            None => schema::validate_element_record(record).map(|_| ()),
        };
        if let Err(err) = outcome {
            warn!("Record {}: {}", i, err);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} of {} records failed validation", failures, records.len());
    }
    info!("All {} records are valid", records.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(&["optinetsim", "resolve", "net-1"]);
        assert!(args.config.is_none());
        assert_eq!(args.threads, 0);
        assert!(matches!(args.command, Command::Resolve { ref network_id, output: None } if network_id == "net-1"));
    }

    #[test]
    fn test_global_options() {
        let args = Args::parse_from(&[
            "optinetsim",
            "--config", "optinetsim.yaml",
            "--log-level", "debug",
            "--store", "store.json",
            "validate", "edfa.json",
            "--category", "Edfa",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("optinetsim.yaml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.store, Some(PathBuf::from("store.json")));
        assert!(matches!(args.command, Command::Validate { category: Some(_), .. }));
    }

    #[test]
    fn test_validate_file() {
        let mut good = NamedTempFile::new().unwrap();
        write!(good, r#"[{{"type_variety": "std", "gain_flatmax": 26}}]"#).unwrap();
        assert!(validate_file(good.path(), Some("Edfa")).is_ok());

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, r#"{{"type": "Fiber", "name": "x", "metadata": {{}}, "colour": "red"}}"#).unwrap();
        assert!(validate_file(bad.path(), None).is_err());

        assert!(validate_file(good.path(), Some("Laser")).is_err());
    }
}
