//! Memoized, single-flight access to the knowledge graph.

use crate::error::SnapshotError;
use crate::graph::{KnowledgeGraph, SnapshotOrigin};
use crate::source::{FileSnapshotSource, HttpSnapshotSource, SnapshotSource};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Where the store looks for a snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotConfig {
    /// Persisted snapshot file, tried first.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// URL serving the same document, tried second.
    #[serde(default)]
    pub url: Option<String>,
}

/// Owns the knowledge graph for the life of the process.
///
/// The first call to [`load`](Self::load) builds the graph; concurrent
/// first callers wait on the same build and every later call returns the
/// same `Arc`. A store never reloads; replace the store to pick up a new
/// snapshot.
pub struct KnowledgeGraphStore {
    seed: KnowledgeGraph,
    sources: Vec<Box<dyn SnapshotSource>>,
    loaded: OnceCell<Arc<KnowledgeGraph>>,
}

impl Default for KnowledgeGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KnowledgeGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraphStore")
            .field("seed_nodes", &self.seed.node_count())
            .field("sources", &self.sources.len())
            .field("loaded", &self.loaded.initialized())
            .finish()
    }
}

impl KnowledgeGraphStore {
    /// A store with no seed graph and no sources.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: KnowledgeGraph::new(),
            sources: Vec::new(),
            loaded: OnceCell::new(),
        }
    }

    /// A store backed by a graph already held in memory.
    #[must_use]
    pub fn with_graph(graph: KnowledgeGraph) -> Self {
        Self {
            seed: graph,
            ..Self::new()
        }
    }

    /// A store reading from the configured file and URL, in that order.
    #[must_use]
    pub fn from_config(config: &SnapshotConfig) -> Self {
        let mut store = Self::new();
        if let Some(path) = &config.path {
            store = store.with_source(FileSnapshotSource::new(path.clone()));
        }
        if let Some(url) = &config.url {
            store = store.with_source(HttpSnapshotSource::new(url.clone()));
        }
        store
    }

    /// Appends a source to try after the existing ones.
    #[must_use]
    pub fn with_source(mut self, source: impl SnapshotSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Returns the knowledge graph, building it on first use.
    ///
    /// Never fails: when no source yields a snapshot the graph is empty.
    pub async fn load(&self) -> Arc<KnowledgeGraph> {
        Arc::clone(self.loaded.get_or_init(|| self.build()).await)
    }

    #[tracing::instrument(skip(self), fields(sources = self.sources.len()))]
    async fn build(&self) -> Arc<KnowledgeGraph> {
        if !self.seed.is_empty() {
            return Arc::new(KnowledgeGraph::from_snapshot(
                self.seed.snapshot(),
                SnapshotOrigin::InMemory,
            ));
        }

        for source in &self.sources {
            let origin = source.origin();
            match source.fetch().await {
                Ok(snapshot) => return Arc::new(KnowledgeGraph::from_snapshot(snapshot, origin)),
                Err(e) => tracing::warn!(%origin, error = %e, "snapshot source failed"),
            }
        }

        let error = SnapshotError::Unavailable {
            attempted: self.sources.len(),
        };
        tracing::warn!(error = %error, "knowledge graph unavailable, continuing with an empty graph");
        Arc::new(KnowledgeGraph::new())
    }
}
