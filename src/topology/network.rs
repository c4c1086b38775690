//! Network documents and their network-wide settings.

use log::info;

use super::{TopologyError, TopologyService};
use crate::model::ids::generate_document_id;
use crate::model::{Network, SimulationConfig, SpanParameters, SpectrumInformation};
use crate::store::{Filter, Patch, NETWORKS};

impl TopologyService {
    /// Create an empty network with empty SI, Span and simulation settings.
    pub fn create_network(&self, owner: &str, name: &str) -> Result<Network, TopologyError> {
        let network = Network::new(generate_document_id(), owner, name);
        self.store.insert(NETWORKS, serde_json::to_value(&network)?)?;
        info!("Created network '{}' ({}) for {}", name, network.id, owner);
        Ok(network)
    }

    pub fn get_network(&self, network_id: &str) -> Result<Network, TopologyError> {
        let doc = self
            .store
            .find(NETWORKS, &Filter::by_id(network_id))?
            .ok_or_else(|| TopologyError::UnknownNetwork(network_id.to_string()))?;
        Ok(serde_json::from_value(doc)?)
    }

    pub fn list_networks(&self, owner: &str) -> Result<Vec<Network>, TopologyError> {
        self.store
            .find_all(NETWORKS, &Filter::all().eq("user_id", owner))?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(TopologyError::from))
            .collect()
    }

    pub fn rename_network(&self, network_id: &str, name: &str) -> Result<(), TopologyError> {
        self.update_network(
            network_id,
            Filter::by_id(network_id),
            Patch::new().set("network_name", name),
        )?;
        Ok(())
    }

    pub fn delete_network(&self, network_id: &str) -> Result<(), TopologyError> {
        if self.store.delete(NETWORKS, &Filter::by_id(network_id))? == 0 {
            return Err(TopologyError::UnknownNetwork(network_id.to_string()));
        }
        info!("Deleted network {}", network_id);
        Ok(())
    }

    /// Bind the network to `library_ids`, replacing any previous binding.
    /// Every id must name an existing library.
    pub fn set_equipment_libraries(
        &self,
        network_id: &str,
        library_ids: Vec<String>,
    ) -> Result<(), TopologyError> {
        for id in &library_ids {
            self.catalog.get_library(id)?;
        }
        let mut network = self.get_network(network_id)?;
        network.bind_libraries(library_ids);
        self.update_network(
            network_id,
            Filter::by_id(network_id),
            binding_patch(&network)?,
        )?;
        Ok(())
    }

    /// Replace the network's SI. Every SI field must be present.
    pub fn update_spectrum_information(
        &self,
        network_id: &str,
        si: &SpectrumInformation,
    ) -> Result<(), TopologyError> {
        let missing = si.missing_fields();
        if !missing.is_empty() {
            return Err(TopologyError::IncompleteSettings {
                section: "SI",
                missing,
            });
        }
        self.update_network(
            network_id,
            Filter::by_id(network_id),
            Patch::new().set("SI", serde_json::to_value(si)?),
        )?;
        Ok(())
    }

    /// Replace the network's Span parameters. Every Span field must be present.
    pub fn update_span_parameters(
        &self,
        network_id: &str,
        span: &SpanParameters,
    ) -> Result<(), TopologyError> {
        let missing = span.missing_fields();
        if !missing.is_empty() {
            return Err(TopologyError::IncompleteSettings {
                section: "Span",
                missing,
            });
        }
        self.update_network(
            network_id,
            Filter::by_id(network_id),
            Patch::new().set("Span", serde_json::to_value(span)?),
        )?;
        Ok(())
    }

    /// Replace the simulation settings. Both parameter blocks are required.
    pub fn update_simulation_config(
        &self,
        network_id: &str,
        simulation_config: &SimulationConfig,
    ) -> Result<(), TopologyError> {
        let mut missing = Vec::new();
        if simulation_config.raman_params.is_none() {
            missing.push("raman_params");
        }
        if simulation_config.nli_params.is_none() {
            missing.push("nli_params");
        }
        if !missing.is_empty() {
            return Err(TopologyError::IncompleteSettings {
                section: "simulation_config",
                missing,
            });
        }
        self.update_network(
            network_id,
            Filter::by_id(network_id),
            Patch::new().set("simulation_config", serde_json::to_value(simulation_config)?),
        )?;
        Ok(())
    }
}

/// Patch writing both library binding fields of `network`.
pub(crate) fn binding_patch(network: &Network) -> Result<Patch, TopologyError> {
    Ok(Patch::new()
        .set(
            "equipment_library_id",
            serde_json::to_value(&network.equipment_library_id)?,
        )
        .set(
            "equipment_library_ids",
            serde_json::to_value(&network.equipment_library_ids)?,
        ))
}

#[cfg(test)]
mod tests {
    use super::super::tests::service;
    use super::*;
    use crate::catalog::CatalogError;
    use crate::model::{NliParams, RamanParams};

    fn full_si() -> SpectrumInformation {
        SpectrumInformation {
            f_min: Some(191.3e12),
            f_max: Some(196.1e12),
            baud_rate: Some(32e9),
            spacing: Some(50e9),
            power_dbm: Some(0.0),
            power_range_db: Some(vec![0.0, 0.0, 1.0]),
            roll_off: Some(0.15),
            tx_osnr: Some(40.0),
            sys_margins: Some(2.0),
        }
    }

    #[test]
    fn test_network_crud() {
        let service = service();
        let network = service.create_network("alice", "metro").unwrap();

        let stored = service.get_network(&network.id).unwrap();
        assert!(stored.elements.is_empty());
        assert_eq!(stored.si, SpectrumInformation::default());
        assert!(stored.simulation_config.is_empty());

        service.rename_network(&network.id, "core").unwrap();
        assert_eq!(service.get_network(&network.id).unwrap().network_name, "core");
        assert_eq!(service.list_networks("alice").unwrap().len(), 1);

        service.delete_network(&network.id).unwrap();
        assert!(matches!(
            service.get_network(&network.id),
            Err(TopologyError::UnknownNetwork(_))
        ));
        assert!(matches!(
            service.rename_network(&network.id, "x"),
            Err(TopologyError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_si_requires_every_field() {
        let service = service();
        let network = service.create_network("alice", "metro").unwrap();

        let mut partial = full_si();
        partial.sys_margins = None;
        partial.roll_off = None;
        match service.update_spectrum_information(&network.id, &partial) {
            Err(TopologyError::IncompleteSettings { section, missing }) => {
                assert_eq!(section, "SI");
                assert_eq!(missing, vec!["roll_off", "sys_margins"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        service.update_spectrum_information(&network.id, &full_si()).unwrap();
        assert_eq!(service.get_network(&network.id).unwrap().si, full_si());
    }

    #[test]
    fn test_span_requires_every_field() {
        let service = service();
        let network = service.create_network("alice", "metro").unwrap();
        let span = SpanParameters {
            power_mode: Some(true),
            max_length: Some(150.0),
            ..SpanParameters::default()
        };
        assert!(matches!(
            service.update_span_parameters(&network.id, &span),
            Err(TopologyError::IncompleteSettings { section: "Span", .. })
        ));
    }

    #[test]
    fn test_simulation_config_requires_both_blocks() {
        let service = service();
        let network = service.create_network("alice", "metro").unwrap();
        let raman_only = SimulationConfig {
            raman_params: Some(RamanParams::default()),
            nli_params: None,
        };
        assert!(matches!(
            service.update_simulation_config(&network.id, &raman_only),
            Err(TopologyError::IncompleteSettings { .. })
        ));

        let full = SimulationConfig {
            raman_params: Some(RamanParams {
                flag: Some(true),
                order: Some(2),
                ..RamanParams::default()
            }),
            nli_params: Some(NliParams {
                method: Some("ggn_spectrally_separated".to_string()),
                computed_channels: Some(vec![1, 18, 37]),
                ..NliParams::default()
            }),
        };
        service.update_simulation_config(&network.id, &full).unwrap();
        assert_eq!(service.get_network(&network.id).unwrap().simulation_config, full);
    }

    #[test]
    fn test_library_binding() {
        let service = service();
        let network = service.create_network("alice", "metro").unwrap();
        let a = service.catalog().create_library("alice", "a").unwrap();
        let b = service.catalog().create_library("alice", "b").unwrap();

        service.set_equipment_libraries(&network.id, vec![a.id.clone()]).unwrap();
        let stored = service.get_network(&network.id).unwrap();
        assert_eq!(stored.equipment_library_id, Some(a.id.clone()));
        assert!(stored.equipment_library_ids.is_none());

        service
            .set_equipment_libraries(&network.id, vec![a.id.clone(), b.id.clone()])
            .unwrap();
        let stored = service.get_network(&network.id).unwrap();
        assert!(stored.equipment_library_id.is_none());
        assert_eq!(stored.library_ids(), vec![a.id.clone(), b.id.clone()]);

        assert!(matches!(
            service.set_equipment_libraries(&network.id, vec!["nope".to_string()]),
            Err(TopologyError::Catalog(CatalogError::UnknownLibrary(_)))
        ));
    }
}
