//! Element and connection operations.
//!
//! Elements are addressed by their generated `element_id`, never by their
//! position in the `elements` array.

use log::debug;
use serde_json::Value;

use super::{TopologyError, TopologyService};
use crate::model::{Connection, ConnectionId, Element, ElementId};
use crate::schema::validate_element_record;
use crate::store::{Filter, Patch};

/// Validate an element record and give it `element_id`.
fn element_from_record(record: &Value, element_id: ElementId) -> Result<Element, TopologyError> {
    validate_element_record(record)?;
    let mut record = record.clone();
    if let Some(object) = record.as_object_mut() {
        object.insert(
            "element_id".to_string(),
            Value::String(element_id.as_str().to_string()),
        );
    }
    Ok(serde_json::from_value(record)?)
}

/// Filter selecting the network only when both endpoints are its elements.
fn endpoints_filter(network_id: &str, from: &ElementId, to: &ElementId) -> Filter {
    Filter::by_id(network_id)
        .eq("elements.element_id", from.as_str())
        .eq("elements.element_id", to.as_str())
}

impl TopologyService {
    /// Validate `record` and append it as a new element with a fresh id.
    /// Any `element_id` in the record is replaced.
    pub fn add_element(&self, network_id: &str, record: &Value) -> Result<Element, TopologyError> {
        let element = element_from_record(record, ElementId::generate())?;
        self.update_network(
            network_id,
            Filter::by_id(network_id),
            Patch::new().push("elements", serde_json::to_value(&element)?),
        )?;
        debug!(
            "Added {} '{}' ({}) to network {}",
            element.element_type, element.name, element.element_id, network_id
        );
        Ok(element)
    }

    /// Replace an element in place, keeping its id.
    pub fn update_element(
        &self,
        network_id: &str,
        element_id: &ElementId,
        record: &Value,
    ) -> Result<Element, TopologyError> {
        let element = element_from_record(record, element_id.clone())?;
        let patch = Patch::new().set_where(
            "elements",
            "element_id",
            element_id.as_str(),
            serde_json::to_value(&element)?,
        );
        if !self.update_network(network_id, Filter::by_id(network_id), patch)? {
            return Err(TopologyError::UnknownElement(element_id.clone()));
        }
        Ok(element)
    }

    /// Remove an element together with every connection that references it.
    pub fn remove_element(&self, network_id: &str, element_id: &ElementId) -> Result<(), TopologyError> {
        let patch = Patch::new()
            .pull("elements", "element_id", element_id.as_str())
            .discard("connections", "from_node", element_id.as_str())
            .discard("connections", "to_node", element_id.as_str());
        if !self.update_network(network_id, Filter::by_id(network_id), patch)? {
            return Err(TopologyError::UnknownElement(element_id.clone()));
        }
        debug!("Removed element {} from network {}", element_id, network_id);
        Ok(())
    }

    /// Connect two existing elements of the network.
    pub fn add_connection(
        &self,
        network_id: &str,
        from: &ElementId,
        to: &ElementId,
    ) -> Result<Connection, TopologyError> {
        let connection = Connection::new(from.clone(), to.clone());
        let patch = Patch::new().push("connections", serde_json::to_value(&connection)?);
        if !self.update_network(network_id, endpoints_filter(network_id, from, to), patch)? {
            return Err(TopologyError::DanglingEndpoint {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(connection)
    }

    /// Point an existing connection at new endpoints, keeping its id.
    pub fn update_connection(
        &self,
        network_id: &str,
        connection_id: &ConnectionId,
        from: &ElementId,
        to: &ElementId,
    ) -> Result<Connection, TopologyError> {
        let network = self.get_network(network_id)?;
        if !network.connections.iter().any(|c| &c.connection_id == connection_id) {
            return Err(TopologyError::UnknownConnection(connection_id.clone()));
        }

        let connection = Connection {
            connection_id: connection_id.clone(),
            from_node: from.clone(),
            to_node: to.clone(),
        };
        let patch = Patch::new().set_where(
            "connections",
            "connection_id",
            connection_id.as_str(),
            serde_json::to_value(&connection)?,
        );
        if !self.update_network(network_id, endpoints_filter(network_id, from, to), patch)? {
            if !self.get_network(network_id)?.connections.iter().any(|c| &c.connection_id == connection_id) {
                return Err(TopologyError::UnknownConnection(connection_id.clone()));
            }
            return Err(TopologyError::DanglingEndpoint {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(connection)
    }

    pub fn remove_connection(
        &self,
        network_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<(), TopologyError> {
        let patch = Patch::new().pull("connections", "connection_id", connection_id.as_str());
        if !self.update_network(network_id, Filter::by_id(network_id), patch)? {
            return Err(TopologyError::UnknownConnection(connection_id.clone()));
        }
        Ok(())
    }
}
