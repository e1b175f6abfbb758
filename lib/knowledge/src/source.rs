//! Places a snapshot can be loaded from.

use crate::error::SnapshotError;
use crate::graph::SnapshotOrigin;
use crate::snapshot::KnowledgeGraphSnapshot;
use async_trait::async_trait;
use rootcause::Report;
use std::path::PathBuf;

/// A source of snapshot documents.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Where loaded graphs should say they came from.
    fn origin(&self) -> SnapshotOrigin;

    /// Loads and decodes the snapshot.
    async fn fetch(&self) -> Result<KnowledgeGraphSnapshot, Report<SnapshotError>>;
}

/// Reads a snapshot file from disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    fn origin(&self) -> SnapshotOrigin {
        SnapshotOrigin::File(self.path.clone())
    }

    async fn fetch(&self) -> Result<KnowledgeGraphSnapshot, Report<SnapshotError>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SnapshotError::FileUnreadable {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        KnowledgeGraphSnapshot::from_json(&text)
    }
}

/// Fetches a snapshot document over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    fn origin(&self) -> SnapshotOrigin {
        SnapshotOrigin::Http(self.url.clone())
    }

    async fn fetch(&self) -> Result<KnowledgeGraphSnapshot, Report<SnapshotError>> {
        let fetch_failed = |reason: String| SnapshotError::FetchFailed {
            url: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(format!("server answered {status}")).into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;
        KnowledgeGraphSnapshot::from_json(&text)
    }
}
