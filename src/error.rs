//! Crate-level error type.
//!
//! Each component has its own error enum; [`Error`] wraps all of them so
//! callers that do not care which component failed can use one `Result`.

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::resolver::ResolutionError;
use crate::schema::SchemaError;
use crate::store::StoreError;
use crate::topology::TopologyError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementId;

    #[test]
    fn test_component_errors_convert() {
        fn dangling() -> Result<()> {
            Err(GraphError::DanglingConnection {
                connection_id: "c1".into(),
                from: ElementId::from("A"),
                to: ElementId::from("C"),
            })?
        }
        let err = dangling().unwrap_err();
        assert!(matches!(err, Error::Graph(GraphError::DanglingConnection { .. })));
        assert!(err.to_string().starts_with("Graph error:"));

        let err: Error = SchemaError::UndefinedField { path: "foo".to_string() }.into();
        assert!(err.to_string().contains("foo"));
    }
}
