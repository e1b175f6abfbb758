//! Narrowing the template library to a bounded, relevant subset.
//!
//! Three tiers, tried in order:
//!
//! 1. [`semantic_tier`]: the embedding backend's similarity between the
//!    embedded query and each template's precomputed vectors
//! 2. [`keyword_tier`]: token overlap with title, description, category
//!    and tags
//! 3. [`raw_prefix`]: the first templates in snapshot order, applied by
//!    node selection when both tiers come back empty

use crate::intent::WorkflowIntent;
use flowsmith_ai::EmbeddingBackend;
use flowsmith_knowledge::CandidateNode;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Shortest token kept by the keyword tier.
const MIN_TOKEN_CHARS: usize = 3;

/// Data-flow steps folded into the query.
const DATA_FLOW_STEPS: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "but", "can", "could", "each", "every",
    "for", "from", "get", "has", "have", "into", "its", "need", "new", "not", "our", "out",
    "please", "should", "some", "than", "that", "the", "their", "them", "then", "there", "they",
    "this", "using", "via", "want", "was", "what", "when", "where", "which", "while", "will",
    "with", "workflow", "would", "you", "your",
];

/// Which retrieval tier produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalTier {
    Semantic,
    Keyword,
    RawPrefix,
}

impl RetrievalTier {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Keyword => "keyword",
            Self::RawPrefix => "raw_prefix",
        }
    }
}

/// Candidates that survived retrieval.
#[derive(Debug, Clone)]
pub struct Retrieval<'g> {
    pub candidates: Vec<CandidateNode<'g>>,
    pub tier: RetrievalTier,
}

/// Builds the query text: request, intent services and capabilities, and
/// the first few data-flow steps.
#[must_use]
pub fn enhanced_query(request: &str, intent: &WorkflowIntent) -> String {
    let mut parts = vec![request.trim().to_string()];
    parts.extend(intent.services.iter().cloned());
    parts.extend(intent.capabilities.iter().cloned());
    parts.extend(intent.data_flow.iter().take(DATA_FLOW_STEPS).cloned());
    parts.retain(|p| !p.is_empty());
    parts.join(" ")
}

/// Splits text into distinct lower-case keyword tokens, first occurrence
/// first.
#[must_use]
pub fn keyword_tokens(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Keeps candidates whose best similarity reaches `min_similarity`, most
/// similar first, at most `max_nodes`.
///
/// Candidates without precomputed vectors score 0 and are skipped.
#[must_use]
pub fn semantic_tier<'g>(
    embeddings: &dyn EmbeddingBackend,
    candidates: &[CandidateNode<'g>],
    query: &[f32],
    min_similarity: f32,
    max_nodes: usize,
) -> Vec<CandidateNode<'g>> {
    let mut scored: Vec<(f32, &CandidateNode<'g>)> = candidates
        .iter()
        .filter_map(|candidate| {
            let best = candidate
                .embeddings()
                .vectors()
                .map(|v| embeddings.cosine_similarity(query, v))
                .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))))?;
            (best >= min_similarity).then_some((best, candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(max_nodes);

    if let Some((top, candidate)) = scored.first() {
        tracing::debug!(top_similarity = top, top_candidate = candidate.id, "semantic tier ranked");
    }

    scored.into_iter().map(|(_, c)| c.clone()).collect()
}

/// Scores candidates by keyword overlap and keeps the positive ones, best
/// first (ties keep snapshot order), at most `max_nodes`.
///
/// Each field (title, description, category, every tag) adds the length of
/// every token it contains.
#[must_use]
pub fn keyword_tier<'g>(
    candidates: &[CandidateNode<'g>],
    tokens: &[String],
    max_nodes: usize,
) -> Vec<CandidateNode<'g>> {
    let mut scored: Vec<(usize, &CandidateNode<'g>)> = candidates
        .iter()
        .map(|candidate| (keyword_score(candidate, tokens), candidate))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(max_nodes);
    scored.into_iter().map(|(_, c)| c.clone()).collect()
}

fn keyword_score(candidate: &CandidateNode<'_>, tokens: &[String]) -> usize {
    let fields = [candidate.title(), candidate.description(), candidate.category()]
        .into_iter()
        .chain(candidate.tags().iter().map(String::as_str))
        .map(str::to_lowercase);

    fields
        .map(|field| {
            tokens
                .iter()
                .filter(|token| field.contains(token.as_str()))
                .map(|token| token.chars().count())
                .sum::<usize>()
        })
        .sum()
}

/// The first `limit` candidates, in their original order.
#[must_use]
pub fn raw_prefix<'g>(candidates: &[CandidateNode<'g>], limit: usize) -> Vec<CandidateNode<'g>> {
    candidates.iter().take(limit).cloned().collect()
}

/// Runs the semantic tier and, if it finds nothing, the keyword tier.
#[derive(Clone)]
pub struct SemanticRetriever {
    embeddings: Arc<dyn EmbeddingBackend>,
    max_nodes: usize,
    min_similarity: f32,
    timeout: Option<Duration>,
}

impl SemanticRetriever {
    #[must_use]
    pub fn new(embeddings: Arc<dyn EmbeddingBackend>, max_nodes: usize, min_similarity: f32) -> Self {
        Self {
            embeddings,
            max_nodes,
            min_similarity,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Narrows `candidates` for this request.
    ///
    /// The result may be empty; the caller decides whether to fall back to
    /// [`raw_prefix`].
    #[tracing::instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn filter<'g>(
        &self,
        candidates: &[CandidateNode<'g>],
        request: &str,
        intent: &WorkflowIntent,
    ) -> Retrieval<'g> {
        let query = enhanced_query(request, intent);

        match self.embed(&query).await {
            Some(vector) => {
                let kept = semantic_tier(
                    self.embeddings.as_ref(),
                    candidates,
                    &vector,
                    self.min_similarity,
                    self.max_nodes,
                );
                if !kept.is_empty() {
                    tracing::info!(kept = kept.len(), "semantic retrieval");
                    return Retrieval {
                        candidates: kept,
                        tier: RetrievalTier::Semantic,
                    };
                }
                tracing::warn!(
                    min_similarity = self.min_similarity,
                    "no candidate reached the similarity floor, using keyword retrieval"
                );
            }
            None => tracing::warn!("query embedding unavailable, using keyword retrieval"),
        }

        let tokens = keyword_tokens(&format!("{query} {}", intent.action));
        let kept = keyword_tier(candidates, &tokens, self.max_nodes);
        tracing::info!(kept = kept.len(), tokens = tokens.len(), "keyword retrieval");
        Retrieval {
            candidates: kept,
            tier: RetrievalTier::Keyword,
        }
    }

    async fn embed(&self, query: &str) -> Option<Vec<f32>> {
        let embedding = self.embeddings.embed_query(query);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, embedding).await {
                Ok(result) => result,
                Err(_) => Err(flowsmith_ai::EmbeddingError::Timeout),
            },
            None => embedding.await,
        };

        match result {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, model = self.embeddings.model(), "query embedding failed");
                None
            }
        }
    }
}
