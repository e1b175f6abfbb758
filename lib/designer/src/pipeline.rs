//! The end-to-end design pipeline.

use crate::config::DesignerConfig;
use crate::connect::{ConnectionSource, ConnectionSynthesizer};
use crate::dedupe::{DedupeStatus, DeduplicationFilter};
use crate::design::{
    DegradationReason, DesignMetadata, DesignedNode, Quality, WorkflowDesign, structural_warnings,
};
use crate::error::DesignError;
use crate::explain::explain;
use crate::intent::IntentExtractor;
use crate::outcome::StageOutcome;
use crate::retrieval::{RetrievalTier, SemanticRetriever};
use crate::selection::NodeSelector;
use chrono::Utc;
use flowsmith_ai::{EmbeddingBackend, LlmBackend};
use flowsmith_core::{DesignId, RequestId};
use flowsmith_knowledge::KnowledgeGraphStore;
use serde::Serialize;
use std::sync::Arc;

/// Result of designing one request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DesignOutcome {
    Designed(Box<WorkflowDesign>),
    NoRelevantNodes { reason: String },
}

impl DesignOutcome {
    /// Returns the design, if one was produced.
    #[must_use]
    pub fn design(&self) -> Option<&WorkflowDesign> {
        match self {
            Self::Designed(design) => Some(design),
            Self::NoRelevantNodes { .. } => None,
        }
    }
}

/// Runs intent extraction, selection, deduplication and connection
/// synthesis against a shared knowledge graph.
#[derive(Clone)]
pub struct WorkflowDesigner {
    store: Arc<KnowledgeGraphStore>,
    intent: IntentExtractor,
    selector: NodeSelector,
    dedupe: DeduplicationFilter,
    connector: ConnectionSynthesizer,
}

impl WorkflowDesigner {
    #[must_use]
    pub fn new(
        store: Arc<KnowledgeGraphStore>,
        llm: Arc<dyn LlmBackend>,
        embeddings: Arc<dyn EmbeddingBackend>,
        config: &DesignerConfig,
    ) -> Self {
        let timeout = config.model_timeout();
        let temperature = Some(config.temperature);

        let retriever = SemanticRetriever::new(embeddings, config.max_nodes, config.min_similarity)
            .with_timeout(timeout);

        Self {
            store,
            intent: IntentExtractor::new(Arc::clone(&llm))
                .with_temperature(temperature)
                .with_timeout(timeout),
            selector: NodeSelector::new(Arc::clone(&llm), retriever, config.raw_fallback_limit)
                .with_temperature(temperature)
                .with_timeout(timeout),
            dedupe: DeduplicationFilter::new(Arc::clone(&llm))
                .with_temperature(temperature)
                .with_timeout(timeout),
            connector: ConnectionSynthesizer::new(llm)
                .with_temperature(temperature)
                .with_timeout(timeout),
        }
    }

    /// Designs a workflow for `request`.
    #[tracing::instrument(skip_all, fields(request_id = %RequestId::new()))]
    pub async fn design(&self, request: &str) -> DesignOutcome {
        let graph = self.store.load().await;
        if graph.is_empty() {
            return no_relevant_nodes(DesignError::SnapshotUnavailable.to_string());
        }

        let intent = self.intent.extract(request).await;
        let candidates = graph.candidates();

        let selection = match self
            .selector
            .try_select(&graph, &candidates, request, &intent)
            .await
        {
            StageOutcome::Ready(selection) => selection,
            StageOutcome::Empty => {
                return no_relevant_nodes("the model selected no nodes for this request".to_string());
            }
            StageOutcome::Failed(report) => return no_relevant_nodes(report.to_string()),
        };

        let mut degradations = Vec::new();
        match selection.tier {
            RetrievalTier::Semantic => {}
            RetrievalTier::Keyword => degradations.push(DegradationReason::KeywordRetrieval),
            RetrievalTier::RawPrefix => degradations.push(DegradationReason::RawCandidateFallback),
        }

        let deduped = self.dedupe.try_dedupe(&graph, selection.scores).await;
        if deduped.status == DedupeStatus::FailedOpen {
            degradations.push(DegradationReason::UndeduplicatedSelection);
        }
        let scores = deduped.selection;

        let plan = self.connector.synthesize(&graph, &scores).await;
        if plan.source == ConnectionSource::SequentialFallback {
            degradations.push(DegradationReason::FallbackConnections);
        }
        let mut warnings = Vec::new();
        if let Some(error) = plan.failure() {
            degradations.push(DegradationReason::NoValidConnections);
            warnings.push(error.to_string());
        }
        warnings.extend(
            plan.rejected
                .iter()
                .map(|r| format!("rejected connection {} -> {}: {}", r.from, r.to, r.reason)),
        );

        let nodes: Vec<DesignedNode> = scores
            .iter()
            .map(|entry| DesignedNode::from_selection(entry, &graph))
            .collect();
        warnings.extend(structural_warnings(&nodes, &plan.connections));

        let quality = Quality::from_reasons(degradations);
        tracing::info!(
            nodes = nodes.len(),
            connections = plan.connections.len(),
            complete = quality.is_complete(),
            "workflow designed"
        );

        DesignOutcome::Designed(Box::new(WorkflowDesign {
            metadata: DesignMetadata {
                design_id: DesignId::new(),
                request: request.to_string(),
                intent,
                quality,
                retrieval_tier: selection.tier,
                candidate_count: selection.candidate_count,
                warnings,
                explanation: explain(&graph, &scores),
                generated_at: Utc::now(),
            },
            nodes,
            connections: plan.connections,
        }))
    }
}

fn no_relevant_nodes(reason: String) -> DesignOutcome {
    tracing::warn!(%reason, "no relevant nodes found");
    DesignOutcome::NoRelevantNodes { reason }
}
