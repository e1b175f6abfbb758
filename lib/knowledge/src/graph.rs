//! Knowledge graph implementation using petgraph.
//!
//! The graph is built once from a snapshot and then only read:
//! - Nodes are templates, services, capabilities and data types
//! - Edges are typed relationships between them
//!
//! Lookups by id go through an index map, so per-request projections stay
//! cheap even on large template libraries.

use crate::edge::{EdgeType, GraphEdge};
use crate::error::GraphError;
use crate::node::{GraphNode, NodeKind, TemplateNode};
use crate::snapshot::{KnowledgeGraphSnapshot, SnapshotMetadata};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Where a loaded graph came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Built from a graph already held in memory.
    InMemory,
    /// Read from a snapshot file.
    File(PathBuf),
    /// Fetched over HTTP.
    Http(String),
    /// No source succeeded.
    Empty,
}

impl fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "in-memory"),
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Http(url) => write!(f, "{url}"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// An immutable, indexed knowledge graph.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    node_index_map: HashMap<String, NodeIndex>,
    metadata: SnapshotMetadata,
    origin: SnapshotOrigin,
    dangling_edges: usize,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index_map: HashMap::new(),
            metadata: SnapshotMetadata::now(0),
            origin: SnapshotOrigin::Empty,
            dangling_edges: 0,
        }
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if the id is already present;
    /// the existing node is kept.
    pub fn add_node(&mut self, node: GraphNode) -> Result<(), GraphError> {
        if self.node_index_map.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { node_id: node.id });
        }
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_index_map.insert(id, index);
        Ok(())
    }

    /// Adds an edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if either endpoint is missing.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<(), GraphError> {
        let source = self.index_of(&edge.source)?;
        let target = self.index_of(&edge.target)?;
        self.graph.add_edge(source, target, edge);
        Ok(())
    }

    fn index_of(&self, node_id: &str) -> Result<NodeIndex, GraphError> {
        self.node_index_map
            .get(node_id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.to_string(),
            })
    }

    /// Builds a graph from a decoded snapshot.
    ///
    /// Duplicate node ids keep the first occurrence. Edges with a missing
    /// endpoint are skipped and counted; edges of unknown type are dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: KnowledgeGraphSnapshot, origin: SnapshotOrigin) -> Self {
        let mut graph = Self::new();
        graph.origin = origin;

        for node in snapshot.nodes {
            if let Err(e) = graph.add_node(node) {
                tracing::warn!(error = %e, "ignoring repeated snapshot node");
            }
        }

        let mut unknown = 0usize;
        for edge in snapshot.edges {
            if edge.edge_type == EdgeType::Unknown {
                unknown += 1;
                continue;
            }
            if let Err(e) = graph.add_edge(edge) {
                tracing::debug!(error = %e, "skipping dangling snapshot edge");
                graph.dangling_edges += 1;
            }
        }

        graph.metadata = SnapshotMetadata {
            template_count: graph.template_count(),
            ..snapshot.metadata
        };

        tracing::info!(
            origin = %graph.origin,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            templates = graph.metadata.template_count,
            dangling_edges = graph.dangling_edges,
            unknown_edges = unknown,
            "knowledge graph built"
        );

        graph
    }

    /// Re-serializes the graph into a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> KnowledgeGraphSnapshot {
        KnowledgeGraphSnapshot {
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self.graph.edge_weights().cloned().collect(),
            metadata: SnapshotMetadata {
                template_count: self.template_count(),
                ..self.metadata.clone()
            },
        }
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&GraphNode> {
        let index = self.node_index_map.get(node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a template by id.
    #[must_use]
    pub fn template(&self, node_id: &str) -> Option<&TemplateNode> {
        self.node(node_id)?.as_template()
    }

    /// Iterates over templates in snapshot order.
    pub fn templates(&self) -> impl Iterator<Item = (&str, &TemplateNode)> {
        self.graph
            .node_weights()
            .filter_map(|node| Some((node.id.as_str(), node.as_template()?)))
    }

    /// Ids of nodes reached from `node_id` over edges of `edge_type`.
    #[must_use]
    pub fn targets_of(&self, node_id: &str, edge_type: EdgeType) -> Vec<&str> {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };

        let mut targets: Vec<&str> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|edge| edge.weight().edge_type == edge_type)
            .filter_map(|edge| self.graph.node_weight(edge.target()))
            .map(|node| node.id.as_str())
            .collect();
        // petgraph walks adjacency lists newest-first
        targets.reverse();
        targets
    }

    /// `CAN_CONNECT_TO` edges whose endpoints are both in `node_ids`.
    #[must_use]
    pub fn connection_hints(&self, node_ids: &[&str]) -> Vec<&GraphEdge> {
        let wanted: HashSet<&str> = node_ids.iter().copied().collect();
        self.graph
            .edge_weights()
            .filter(|edge| edge.edge_type == EdgeType::CanConnectTo)
            .filter(|edge| {
                edge.source != edge.target
                    && wanted.contains(edge.source.as_str())
                    && wanted.contains(edge.target.as_str())
            })
            .collect()
    }

    /// Resolves a service id to its display name.
    ///
    /// Falls back to the id without its `service:` namespace when no service
    /// node exists.
    #[must_use]
    pub fn service_name(&self, service_id: &str) -> String {
        match self.node(service_id).map(|n| &n.kind) {
            Some(NodeKind::Service(service)) => service.name.clone(),
            _ => service_id
                .strip_prefix("service:")
                .unwrap_or(service_id)
                .to_string(),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Edges skipped at build time because an endpoint was missing.
    #[must_use]
    pub fn dangling_edges(&self) -> usize {
        self.dangling_edges
    }

    #[must_use]
    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn origin(&self) -> &SnapshotOrigin {
        &self.origin
    }
}
