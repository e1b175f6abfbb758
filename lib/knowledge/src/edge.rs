//! Typed edges between knowledge graph nodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Source template output may feed target template input. Directional.
    CanConnectTo,
    HasCapability,
    /// Target is a `service:` namespaced id.
    IntegratesWith,
    Accepts,
    Outputs,
    AlternativeTo,
    CommonlyUsedWith,
    /// Any type this build does not know. Tolerated and ignored.
    #[serde(other)]
    Unknown,
}

/// A directed, typed edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EdgeRecord", into = "EdgeRecord")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    /// Extra attributes (`sourcePort`, `targetPort`, weights, ...).
    pub data: Option<Map<String, JsonValue>>,
}

impl GraphEdge {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type,
            data: None,
        }
    }

    /// Attaches port hints to a `CAN_CONNECT_TO` edge.
    #[must_use]
    pub fn with_ports(mut self, source_port: &str, target_port: &str) -> Self {
        let data = self.data.get_or_insert_with(Map::new);
        data.insert("sourcePort".to_string(), JsonValue::from(source_port));
        data.insert("targetPort".to_string(), JsonValue::from(target_port));
        self
    }

    /// Returns the suggested source port, if any.
    #[must_use]
    pub fn source_port(&self) -> Option<&str> {
        self.data_str("sourcePort")
    }

    /// Returns the suggested target port, if any.
    #[must_use]
    pub fn target_port(&self) -> Option<&str> {
        self.data_str("targetPort")
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}

/// On-disk shape: `{"source", "target", "attributes": {"type", ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeRecord {
    source: String,
    target: String,
    attributes: EdgeAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeAttributes {
    #[serde(rename = "type")]
    edge_type: EdgeType,
    #[serde(flatten)]
    data: Map<String, JsonValue>,
}

impl From<EdgeRecord> for GraphEdge {
    fn from(record: EdgeRecord) -> Self {
        let data = record.attributes.data;
        Self {
            source: record.source,
            target: record.target,
            edge_type: record.attributes.edge_type,
            data: (!data.is_empty()).then_some(data),
        }
    }
}

impl From<GraphEdge> for EdgeRecord {
    fn from(edge: GraphEdge) -> Self {
        Self {
            source: edge.source,
            target: edge.target,
            attributes: EdgeAttributes {
                edge_type: edge.edge_type,
                data: edge.data.unwrap_or_default(),
            },
        }
    }
}
