//! Snapshot document codec.
//!
//! Decoding is lenient: a node record that does not match any known variant
//! is skipped with a warning instead of failing the whole document, and an
//! edge that cannot be decoded is dropped the same way. Only a document that
//! is not a JSON object at all is rejected.

use crate::edge::GraphEdge;
use crate::error::SnapshotError;
use crate::node::{GraphNode, NodeKind};
use chrono::{DateTime, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Snapshot bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub template_count: usize,
    pub version: String,
}

impl SnapshotMetadata {
    /// Metadata stamped now.
    #[must_use]
    pub fn now(template_count: usize) -> Self {
        Self {
            created_at: Utc::now(),
            template_count,
            version: SNAPSHOT_VERSION.to_string(),
        }
    }
}

/// A serialized knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    nodes: Vec<JsonValue>,
    #[serde(default)]
    edges: Vec<JsonValue>,
    #[serde(default)]
    metadata: Option<JsonValue>,
}

impl KnowledgeGraphSnapshot {
    /// Number of template nodes.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Template(_)))
            .count()
    }

    /// Decodes a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] when the text is not a JSON
    /// object with optional `nodes`/`edges`/`metadata` members.
    pub fn from_json(text: &str) -> Result<Self, Report<SnapshotError>> {
        let raw: RawSnapshot =
            serde_json::from_str(text).map_err(|e| SnapshotError::Malformed {
                reason: e.to_string(),
            })?;

        let mut nodes = Vec::with_capacity(raw.nodes.len());
        for record in raw.nodes {
            match serde_json::from_value::<GraphNode>(record) {
                Ok(mut node) => {
                    if let NodeKind::Template(template) = &mut node.kind {
                        template.normalize_ports();
                    }
                    nodes.push(node);
                }
                Err(e) => tracing::warn!(error = %e, "skipping malformed snapshot node"),
            }
        }

        let mut edges = Vec::with_capacity(raw.edges.len());
        for record in raw.edges {
            match serde_json::from_value::<GraphEdge>(record) {
                Ok(edge) => edges.push(edge),
                Err(e) => tracing::warn!(error = %e, "skipping malformed snapshot edge"),
            }
        }

        let template_count = nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Template(_)))
            .count();

        let metadata = raw
            .metadata
            .and_then(|value| match serde_json::from_value::<SnapshotMetadata>(value) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot metadata unreadable, restamping");
                    None
                }
            })
            .unwrap_or_else(|| SnapshotMetadata::now(template_count));

        if metadata.template_count != template_count {
            tracing::debug!(
                declared = metadata.template_count,
                decoded = template_count,
                "snapshot template count differs from decoded templates"
            );
        }

        Ok(Self {
            nodes,
            edges,
            metadata,
        })
    }

    /// Encodes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] if a value cannot be encoded.
    pub fn to_json(&self) -> Result<String, Report<SnapshotError>> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SnapshotError::Malformed {
                reason: e.to_string(),
            }
            .into()
        })
    }
}
