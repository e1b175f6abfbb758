//! Error types for the knowledge crate.
//!
//! - `SnapshotError`: a snapshot source could not produce a snapshot
//! - `GraphError`: structural problems while assembling a graph

use std::fmt;
use std::path::PathBuf;

/// Errors from loading or decoding a knowledge graph snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    FileUnreadable { path: PathBuf, reason: String },
    /// The secondary HTTP fetch failed.
    FetchFailed { url: String, reason: String },
    /// The document is not a snapshot.
    Malformed { reason: String },
    /// Every configured source failed.
    Unavailable { attempted: usize },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileUnreadable { path, reason } => {
                write!(f, "snapshot file {} unreadable: {reason}", path.display())
            }
            Self::FetchFailed { url, reason } => {
                write!(f, "snapshot fetch from {url} failed: {reason}")
            }
            Self::Malformed { reason } => write!(f, "malformed snapshot: {reason}"),
            Self::Unavailable { attempted } => {
                write!(f, "no snapshot available after trying {attempted} source(s)")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Errors from graph assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node with this id is already present.
    DuplicateNode { node_id: String },
    /// An edge endpoint does not exist.
    NodeNotFound { node_id: String },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
        }
    }
}

impl std::error::Error for GraphError {}
