//! Embedding backend abstraction.
//!
//! The retriever embeds the query once per request and compares it against
//! vectors that were precomputed into the knowledge graph snapshot.

use crate::error::EmbeddingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for an embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingBackendConfig {
    /// Base URL for the API.
    pub base_url: String,
    /// Embedding model identifier. Must match the model used to build the snapshot.
    pub model: String,
    /// API key (if required).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embeds a query string.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding service fails.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Compares two vectors.
    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }

    /// Returns the model name.
    fn model(&self) -> &str;
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 for vectors of different length or zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
