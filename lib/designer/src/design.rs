//! The produced workflow design.
//!
//! A design is a node list, a connection list and metadata describing how
//! it was produced. Node positions are left to the caller.

use crate::connect::ConnectionEdge;
use crate::intent::WorkflowIntent;
use crate::retrieval::RetrievalTier;
use crate::selection::RelevanceScore;
use chrono::{DateTime, Utc};
use flowsmith_core::DesignId;
use flowsmith_knowledge::KnowledgeGraph;
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// A finished design.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDesign {
    pub nodes: Vec<DesignedNode>,
    pub connections: Vec<ConnectionEdge>,
    pub metadata: DesignMetadata,
}

/// A node in the design.
#[derive(Debug, Clone, Serialize)]
pub struct DesignedNode {
    pub id: String,
    /// Template id.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<JsonValue>,
    /// Property default values.
    pub config: Map<String, JsonValue>,
    pub metadata: DesignedNodeMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignedNodeMetadata {
    pub title: String,
    pub category: String,
    pub score: u8,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

impl DesignedNode {
    /// Builds a design node from a selection entry and its template.
    #[must_use]
    pub fn from_selection(entry: &RelevanceScore, graph: &KnowledgeGraph) -> Self {
        let template = graph.template(&entry.node_id);
        Self {
            id: entry.node_id.clone(),
            node_type: entry.node_id.clone(),
            position: None,
            config: template.map(|t| t.default_config()).unwrap_or_default(),
            metadata: DesignedNodeMetadata {
                title: template.map_or_else(|| entry.node_id.clone(), |t| t.title.clone()),
                category: template.map(|t| t.category.clone()).unwrap_or_default(),
                score: entry.score,
                reasons: entry.reasons.clone(),
                role: entry.metadata.role.clone(),
                sequence: entry.metadata.sequence,
            },
        }
    }
}

/// How the design was produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignMetadata {
    pub design_id: DesignId,
    pub request: String,
    pub intent: WorkflowIntent,
    pub quality: Quality,
    pub retrieval_tier: RetrievalTier,
    pub candidate_count: usize,
    pub warnings: Vec<String>,
    pub explanation: String,
    pub generated_at: DateTime<Utc>,
}

/// Whether every stage produced its primary result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Quality {
    Complete,
    Degraded { reasons: Vec<DegradationReason> },
}

impl Quality {
    /// `Complete` when there are no reasons.
    #[must_use]
    pub fn from_reasons(reasons: Vec<DegradationReason>) -> Self {
        if reasons.is_empty() {
            Self::Complete
        } else {
            Self::Degraded { reasons }
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// A stage that fell back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationReason {
    FallbackConnections,
    UndeduplicatedSelection,
    NoValidConnections,
    KeywordRetrieval,
    RawCandidateFallback,
}

/// Structural warnings for a designed graph: cycles, a graph with no entry
/// or no terminal node, and nodes left unconnected in a multi-node design.
#[must_use]
pub fn structural_warnings(nodes: &[DesignedNode], connections: &[ConnectionEdge]) -> Vec<String> {
    let mut graph: DiGraph<&str, f32> = DiGraph::new();
    let index: HashMap<&str, NodeIndex> = nodes
        .iter()
        .map(|node| (node.id.as_str(), graph.add_node(node.id.as_str())))
        .collect();

    for edge in connections {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            graph.add_edge(from, to, edge.confidence);
        }
    }

    let mut warnings = Vec::new();
    if is_cyclic_directed(&graph) {
        warnings.push("design contains a cycle".to_string());
    }

    if graph.node_count() > 1 {
        for idx in graph.node_indices() {
            let incoming = graph.neighbors_directed(idx, Direction::Incoming).count();
            let outgoing = graph.neighbors_directed(idx, Direction::Outgoing).count();
            if incoming == 0 && outgoing == 0 {
                warnings.push(format!("node {} is not connected", graph[idx]));
            }
        }
    }

    let entries = graph
        .node_indices()
        .filter(|&idx| graph.neighbors_directed(idx, Direction::Incoming).next().is_none())
        .count();
    let terminals = graph
        .node_indices()
        .filter(|&idx| graph.neighbors_directed(idx, Direction::Outgoing).next().is_none())
        .count();
    if graph.node_count() > 0 {
        if entries == 0 {
            warnings.push("design has no entry node".to_string());
        }
        if terminals == 0 {
            warnings.push("design has no terminal node".to_string());
        }
    }
    tracing::debug!(entries, terminals, warnings = warnings.len(), "design structure checked");

    warnings
}
