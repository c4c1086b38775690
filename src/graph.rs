//! Directed topology graph handed to the simulation engine.
//!
//! One node per resolved element, one edge per connection. Edges leaving a
//! fiber are weighted by the fiber length in meters, every other edge by a
//! small placeholder weight.

use log::debug;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::GraphConfig;
use crate::model::{Connection, ConnectionId, ElementId, ElementType};
use crate::resolver::ResolvedElement;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("can not find {from} or {to} defined in connection {connection_id}")]
    DanglingConnection {
        connection_id: ConnectionId,
        from: ElementId,
        to: ElementId,
    },

    #[error("Element {0} appears more than once")]
    DuplicateElement(ElementId),

    #[error("{element_type} element {element_id} has no numeric length")]
    MissingLength {
        element_id: ElementId,
        element_type: ElementType,
    },

    #[error("Unknown length unit '{unit}' on element {element_id}")]
    UnknownLengthUnit { element_id: ElementId, unit: String },
}

/// Unit of a fiber `length` param.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    #[default]
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
}

impl LengthUnit {
    pub fn to_meters(self, length: f64) -> f64 {
        match self {
            LengthUnit::Meters => length,
            LengthUnit::Kilometers => length * 1000.0,
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Meters => f.write_str("m"),
            LengthUnit::Kilometers => f.write_str("km"),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(LengthUnit::Meters),
            "km" => Ok(LengthUnit::Kilometers),
            other => Err(other.to_string()),
        }
    }
}

/// Edge payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub connection_id: ConnectionId,
    pub weight: f64,
}

/// Serializable form of a [`TopologyGraph`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<ResolvedElement>,
    pub edges: Vec<ExportedEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedEdge {
    pub connection_id: ConnectionId,
    pub from: ElementId,
    pub to: ElementId,
    pub weight: f64,
}

/// Directed graph of resolved elements.
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    graph: DiGraph<ResolvedElement, Link>,
    index: HashMap<ElementId, NodeIndex>,
}

/// Weight of an edge leaving `source`.
fn edge_weight(source: &ResolvedElement, config: &GraphConfig) -> Result<f64, GraphError> {
    if !source.element_type.is_fiber() {
        return Ok(config.placeholder_weight);
    }

    let length = source
        .params
        .get("length")
        .and_then(Value::as_f64)
        .ok_or_else(|| GraphError::MissingLength {
            element_id: source.element_id.clone(),
            element_type: source.element_type,
        })?;

    let unit = match source.params.get("length_units").and_then(Value::as_str) {
        Some(unit) => unit.parse::<LengthUnit>().map_err(|unit| GraphError::UnknownLengthUnit {
            element_id: source.element_id.clone(),
            unit,
        })?,
        None => config.default_length_units,
    };

    Ok(unit.to_meters(length))
}

impl TopologyGraph {
    /// Build the graph from resolved elements and the network's connections.
    ///
    /// # Arguments
    /// * `elements` - Resolved elements, ids unique
    /// * `connections` - Connections whose endpoints must all be among `elements`
    /// * `config` - Placeholder weight and default length unit
    pub fn build(
        elements: Vec<ResolvedElement>,
        connections: &[Connection],
        config: &GraphConfig,
    ) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(elements.len(), connections.len());
        let mut index = HashMap::with_capacity(elements.len());

        for element in elements {
            let id = element.element_id.clone();
            if index.contains_key(&id) {
                return Err(GraphError::DuplicateElement(id));
            }
            let node = graph.add_node(element);
            index.insert(id, node);
        }

        for connection in connections {
            let (from, to) = match (index.get(&connection.from_node), index.get(&connection.to_node)) {
                (Some(from), Some(to)) => (*from, *to),
                _ => {
                    return Err(GraphError::DanglingConnection {
                        connection_id: connection.connection_id.clone(),
                        from: connection.from_node.clone(),
                        to: connection.to_node.clone(),
                    })
                }
            };
            let weight = edge_weight(&graph[from], config)?;
            graph.add_edge(
                from,
                to,
                Link {
                    connection_id: connection.connection_id.clone(),
                    weight,
                },
            );
        }

        debug!(
            "Built topology graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self { graph, index })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &ElementId) -> Option<&ResolvedElement> {
        self.index.get(id).map(|node| &self.graph[*node])
    }

    /// Elements reachable over one outgoing edge of `id`.
    pub fn successors(&self, id: &ElementId) -> Vec<&ResolvedElement> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Elements with an edge into `id`.
    pub fn predecessors(&self, id: &ElementId) -> Vec<&ResolvedElement> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &ElementId, direction: Direction) -> Vec<&ResolvedElement> {
        match self.index.get(id) {
            Some(node) => self
                .graph
                .neighbors_directed(*node, direction)
                .map(|n| &self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Weight of the first edge from `from` to `to`.
    pub fn weight(&self, from: &ElementId, to: &ElementId) -> Option<f64> {
        let from = *self.index.get(from)?;
        let to = *self.index.get(to)?;
        self.graph
            .find_edge(from, to)
            .map(|edge: EdgeIndex| self.graph[edge].weight)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedElement> {
        self.graph.node_weights()
    }

    pub fn export(&self) -> GraphExport {
        let nodes = self.graph.node_weights().cloned().collect();
        let edges = self
            .graph
            .edge_references()
            .map(|edge| ExportedEdge {
                connection_id: edge.weight().connection_id.clone(),
                from: self.graph[edge.source()].element_id.clone(),
                to: self.graph[edge.target()].element_id.clone(),
                weight: edge.weight().weight,
            })
            .collect();
        GraphExport { nodes, edges }
    }
}
