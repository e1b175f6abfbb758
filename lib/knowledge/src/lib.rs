//! Template knowledge graph for flowsmith.
//!
//! A knowledge graph holds the reusable templates a workflow can be built
//! from, plus the services, capabilities and data types that describe them:
//!
//! - [`KnowledgeGraphSnapshot`]: the serialized document
//! - [`KnowledgeGraph`]: an indexed, read-only petgraph built from a snapshot
//! - [`KnowledgeGraphStore`]: loads the graph once per process from the
//!   first [`SnapshotSource`] that succeeds
//! - [`CandidateNode`]: a per-request projection of a template

pub mod candidate;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;
pub mod port;
pub mod snapshot;
pub mod source;
pub mod store;

pub use candidate::CandidateNode;
pub use edge::{EdgeType, GraphEdge};
pub use error::{GraphError, SnapshotError};
pub use graph::{KnowledgeGraph, SnapshotOrigin};
pub use node::{
    CapabilityNode, DataTypeNode, GraphNode, NodeKind, ServiceNode, TemplateEmbeddings,
    TemplateNode,
};
pub use port::{PortDirection, PortKind, TemplatePort};
pub use snapshot::{KnowledgeGraphSnapshot, SnapshotMetadata};
pub use source::{FileSnapshotSource, HttpSnapshotSource, SnapshotSource};
pub use store::{KnowledgeGraphStore, SnapshotConfig};
