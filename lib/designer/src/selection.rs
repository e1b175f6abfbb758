//! Asking the model to choose, score and sequence nodes.

use crate::error::DesignError;
use crate::intent::WorkflowIntent;
use crate::lenient::{StringOrList, non_blank, number};
use crate::outcome::StageOutcome;
use crate::retrieval::{RetrievalTier, SemanticRetriever, raw_prefix};
use flowsmith_ai::response::parse_json_array;
use flowsmith_ai::{LlmBackend, LlmCall};
use flowsmith_knowledge::{CandidateNode, KnowledgeGraph, TemplatePort};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Sequence assumed for entries that do not give one.
pub const UNSEQUENCED: u32 = 999;

const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 100;
const DEFAULT_SCORE: f64 = 50.0;

const SYSTEM_PROMPT: &str =
    "You design automation workflows from a fixed catalogue of nodes. Reply with a JSON array only.";

/// A node chosen by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceScore {
    pub node_id: String,
    /// 1..=100.
    pub score: u8,
    pub reasons: Vec<String>,
    /// Node ids the model expects this node to feed.
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub metadata: SelectionMetadata,
}

impl RelevanceScore {
    #[must_use]
    pub fn new(node_id: impl Into<String>, score: u8) -> Self {
        Self {
            node_id: node_id.into(),
            score: score.clamp(MIN_SCORE, MAX_SCORE),
            reasons: Vec::new(),
            connections: Vec::new(),
            metadata: SelectionMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.metadata.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.metadata.sequence = Some(sequence);
        self
    }

    /// Sequence used for ordering.
    #[must_use]
    pub fn sequence_or_default(&self) -> u32 {
        self.metadata.sequence.unwrap_or(UNSEQUENCED)
    }
}

/// Placement hints for a selected node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

/// The selector's result together with how its candidates were found.
#[derive(Debug, Clone)]
pub struct Selection {
    pub scores: Vec<RelevanceScore>,
    pub tier: RetrievalTier,
    /// Candidates offered to the model.
    pub candidate_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScore {
    #[serde(default)]
    node_id: Option<JsonValue>,
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    score: Option<JsonValue>,
    #[serde(default)]
    reasons: StringOrList,
    #[serde(default)]
    reason: StringOrList,
    #[serde(default)]
    connections: StringOrList,
    #[serde(default)]
    role: Option<JsonValue>,
    #[serde(default)]
    sequence: Option<JsonValue>,
}

impl RawScore {
    fn into_score(self) -> Option<RelevanceScore> {
        let node_id = non_blank(self.node_id.as_ref()).or_else(|| non_blank(self.id.as_ref()))?;

        let score = self.score.as_ref().and_then(number).unwrap_or(DEFAULT_SCORE);
        let mut reasons = self.reasons.into_vec();
        reasons.extend(self.reason.into_vec());

        Some(RelevanceScore {
            node_id,
            score: clamp_score(score),
            reasons,
            connections: self.connections.into_vec(),
            metadata: SelectionMetadata {
                role: non_blank(self.role.as_ref()),
                sequence: self
                    .sequence
                    .as_ref()
                    .and_then(number)
                    .filter(|s| *s >= 0.0)
                    .map(|s| s.round().min(f64::from(u32::MAX)) as u32),
            },
        })
    }
}

fn clamp_score(score: f64) -> u8 {
    score
        .round()
        .clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u8
}

/// Parses the model's selection.
///
/// Never fails: unparseable answers give an empty list. Entries are
/// normalized, entries without an id or naming something that is not a
/// template in `graph` are dropped, the list is stably ordered by ascending
/// sequence then descending score, and repeated ids keep their first entry.
#[must_use]
pub fn parse_selection(content: &str, graph: &KnowledgeGraph) -> Vec<RelevanceScore> {
    match parse_entries(content, graph) {
        Ok((scores, _)) => scores,
        Err(e) => {
            tracing::warn!(error = %e, "selection answer unparseable");
            Vec::new()
        }
    }
}

/// Parses and validates, reporting how many entries were dropped.
fn parse_entries(
    content: &str,
    graph: &KnowledgeGraph,
) -> Result<(Vec<RelevanceScore>, usize), flowsmith_ai::ResponseError> {
    let entries = parse_json_array(content)?;
    let total = entries.len();

    let mut scores: Vec<RelevanceScore> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawScore>(entry) {
            Ok(raw) => raw.into_score(),
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed selection entry");
                None
            }
        })
        .filter(|score| {
            let known = graph.template(&score.node_id).is_some();
            if !known {
                tracing::warn!(node_id = %score.node_id, "dropping selection of unknown template");
            }
            known
        })
        .collect();

    scores.sort_by(|a, b| {
        a.sequence_or_default()
            .cmp(&b.sequence_or_default())
            .then_with(|| b.score.cmp(&a.score))
    });

    let mut seen = HashSet::new();
    scores.retain(|score| seen.insert(score.node_id.clone()));

    let dropped = total - scores.len();
    Ok((scores, dropped))
}

/// Chooses nodes for a request.
#[derive(Clone)]
pub struct NodeSelector {
    llm: Arc<dyn LlmBackend>,
    retriever: SemanticRetriever,
    raw_fallback_limit: usize,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl NodeSelector {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmBackend>, retriever: SemanticRetriever, raw_fallback_limit: usize) -> Self {
        Self {
            llm,
            retriever,
            raw_fallback_limit,
            temperature: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Selects nodes, returning an empty list on any failure.
    pub async fn select(
        &self,
        graph: &KnowledgeGraph,
        candidates: &[CandidateNode<'_>],
        request: &str,
        intent: &WorkflowIntent,
    ) -> Vec<RelevanceScore> {
        self.try_select(graph, candidates, request, intent)
            .await
            .ready()
            .map(|selection| selection.scores)
            .unwrap_or_default()
    }

    /// Selects nodes.
    ///
    /// Fails with [`DesignError::EmptyCandidateSet`] when there is nothing
    /// to choose from, [`DesignError::ModelInvocation`] when the model call
    /// fails, [`DesignError::MalformedModelResponse`] when nothing can be
    /// parsed and [`DesignError::NoValidSelection`] when every entry is
    /// dropped. A parseable empty answer is [`StageOutcome::Empty`].
    #[tracing::instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn try_select(
        &self,
        graph: &KnowledgeGraph,
        candidates: &[CandidateNode<'_>],
        request: &str,
        intent: &WorkflowIntent,
    ) -> StageOutcome<Selection> {
        if candidates.is_empty() {
            tracing::warn!("no candidates to select from");
            return StageOutcome::failed(DesignError::EmptyCandidateSet);
        }

        let mut retrieval = self.retriever.filter(candidates, request, intent).await;
        if retrieval.candidates.is_empty() {
            tracing::warn!(
                limit = self.raw_fallback_limit,
                "retrieval found nothing, offering the first raw candidates"
            );
            retrieval.candidates = raw_prefix(candidates, self.raw_fallback_limit);
            retrieval.tier = RetrievalTier::RawPrefix;
        }
        let offered = retrieval.candidates.len();

        let result = LlmCall::new("selection", selection_prompt(&retrieval.candidates, request, intent))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout)
            .invoke(self.llm.as_ref())
            .await;

        let content = match result {
            Ok(call) => call.content,
            Err(report) => {
                return StageOutcome::Failed(
                    report.context(DesignError::ModelInvocation { stage: "selection" }),
                );
            }
        };

        match parse_entries(&content, graph) {
            Ok((scores, 0)) if scores.is_empty() => {
                tracing::info!("model selected no nodes");
                StageOutcome::Empty
            }
            Ok((scores, dropped)) if scores.is_empty() => {
                StageOutcome::failed(DesignError::NoValidSelection { dropped })
            }
            Ok((scores, dropped)) => {
                tracing::info!(
                    selected = scores.len(),
                    dropped,
                    tier = retrieval.tier.as_str(),
                    "nodes selected"
                );
                StageOutcome::Ready(Selection {
                    scores,
                    tier: retrieval.tier,
                    candidate_count: offered,
                })
            }
            Err(e) => StageOutcome::failed(DesignError::MalformedModelResponse {
                stage: "selection",
                reason: e.to_string(),
            }),
        }
    }
}

fn describe_ports(ports: &[TemplatePort]) -> String {
    ports
        .iter()
        .map(|p| match &p.data_type {
            Some(data_type) => format!("{} ({}, {data_type})", p.id, p.kind().as_str()),
            None => format!("{} ({})", p.id, p.kind().as_str()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn selection_prompt(candidates: &[CandidateNode<'_>], request: &str, intent: &WorkflowIntent) -> String {
    let mut catalogue = String::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let template = candidate.template;
        catalogue.push_str(&format!("{}. id: {}\n", index + 1, candidate.id));
        catalogue.push_str(&format!("   title: {}\n", candidate.title()));
        match &template.subcategory {
            Some(sub) => catalogue.push_str(&format!("   category: {} / {sub}\n", candidate.category())),
            None => catalogue.push_str(&format!("   category: {}\n", candidate.category())),
        }
        if !candidate.description().is_empty() {
            catalogue.push_str(&format!("   description: {}\n", candidate.description()));
        }
        if !candidate.capabilities().is_empty() {
            catalogue.push_str(&format!("   capabilities: {}\n", candidate.capabilities().join(", ")));
        }
        if !candidate.services.is_empty() {
            catalogue.push_str(&format!("   services: {}\n", candidate.services.join(", ")));
        }
        if !candidate.tags().is_empty() {
            catalogue.push_str(&format!("   tags: {}\n", candidate.tags().join(", ")));
        }
        if !candidate.inputs().is_empty() {
            catalogue.push_str(&format!("   inputs: {}\n", describe_ports(candidate.inputs())));
        }
        if !candidate.outputs().is_empty() {
            catalogue.push_str(&format!("   outputs: {}\n", describe_ports(candidate.outputs())));
        }
        if !template.properties.is_empty() {
            let names: Vec<&str> = template.properties.keys().map(String::as_str).collect();
            catalogue.push_str(&format!("   properties: {}\n", names.join(", ")));
        }
        if template.rules.is_some() {
            catalogue.push_str("   has property rules\n");
        }
    }

    format!(
        r#"Choose the nodes needed to build this workflow.

Request: "{request}"
Intent: action "{action}"; services [{services}]; capabilities [{capabilities}]

Available nodes:
{catalogue}
Selection policy:
- Use only ids from the list above.
- When a service is mentioned, include every node variant for that service that could be useful (readers, writers, triggers); unused extras are removed later.
- When the request is generic, match on tags and capabilities.
- Include the glue the workflow needs: triggers, transforms, filters, branches.

Return a JSON array. One object per chosen node:
{{"nodeId": "<id>", "score": <1-100 relevance>, "reasons": ["<why>"], "role": "trigger|source|transform|sink|utility", "sequence": <position in the flow, starting at 1>}}

Answer with the JSON array only."#,
        action = intent.action,
        services = intent.services.join(", "),
        capabilities = intent.capabilities.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsmith_ai::LlmError;
    use flowsmith_ai::testing::{FixedEmbeddingBackend, ScriptedLlmBackend};
    use flowsmith_knowledge::{
        GraphNode, KnowledgeGraphSnapshot, SnapshotMetadata, SnapshotOrigin, TemplateNode,
    };

    fn graph() -> KnowledgeGraph {
        let nodes = ["tpl_a", "tpl_b", "tpl_c"]
            .into_iter()
            .map(|id| GraphNode::template(id, TemplateNode::new(id.to_uppercase(), "misc")))
            .chain([GraphNode::service("service:x", "X")])
            .collect();
        KnowledgeGraph::from_snapshot(
            KnowledgeGraphSnapshot {
                nodes,
                edges: Vec::new(),
                metadata: SnapshotMetadata::now(3),
            },
            SnapshotOrigin::InMemory,
        )
    }

    fn ids(scores: &[RelevanceScore]) -> Vec<&str> {
        scores.iter().map(|s| s.node_id.as_str()).collect()
    }

    #[test]
    fn catalogue_lists_capabilities_and_ports() {
        let mut pg = TemplateNode::new("PostgreSQL", "database")
            .with_input(TemplatePort::input("trigger-in"))
            .with_output(TemplatePort::output("data-out").with_data_type("array"));
        pg.capabilities = vec!["query".to_string(), "insert".to_string()];
        let graph = KnowledgeGraph::from_snapshot(
            KnowledgeGraphSnapshot {
                nodes: vec![GraphNode::template("tpl_pg", pg)],
                edges: Vec::new(),
                metadata: SnapshotMetadata::now(1),
            },
            SnapshotOrigin::InMemory,
        );

        let prompt = selection_prompt(&graph.candidates(), "dump rows", &WorkflowIntent::minimal());
        assert!(prompt.contains("1. id: tpl_pg\n   title: PostgreSQL\n   category: database\n"));
        assert!(prompt.contains("   capabilities: query, insert\n"));
        assert!(prompt.contains("   inputs: trigger-in (trigger)\n"));
        assert!(prompt.contains("   outputs: data-out (data, array)\n"));
    }

    fn selector(llm: ScriptedLlmBackend) -> (NodeSelector, Arc<ScriptedLlmBackend>) {
        let llm = Arc::new(llm);
        let retriever = SemanticRetriever::new(Arc::new(FixedEmbeddingBackend::failing()), 50, 0.25);
        (NodeSelector::new(llm.clone(), retriever, 20), llm)
    }

    #[test]
    fn fenced_and_plain_answers_agree() {
        let graph = graph();
        let plain = r#"[{"nodeId": "tpl_a", "score": 90, "reasons": ["reads"]}]"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(parse_selection(plain, &graph), parse_selection(&fenced, &graph));
        assert_eq!(parse_selection(plain, &graph).len(), 1);
    }

    #[test]
    fn prose_wrapped_array_is_recovered() {
        let graph = graph();
        let scores = parse_selection(r#"Here: [{"id": "tpl_b", "score": 70}] done."#, &graph);
        assert_eq!(ids(&scores), vec!["tpl_b"]);
    }

    #[test]
    fn missing_and_empty_ids_are_dropped() {
        let graph = graph();
        let scores = parse_selection(
            r#"[{"score": 80}, {"nodeId": "", "score": 70}, {"nodeId": "  "}, {"nodeId": "tpl_c"}]"#,
            &graph,
        );
        assert_eq!(ids(&scores), vec!["tpl_c"]);
    }

    #[test]
    fn unknown_and_non_template_ids_are_dropped() {
        let graph = graph();
        let scores = parse_selection(
            r#"[{"nodeId": "tpl_zzz"}, {"nodeId": "service:x"}, {"nodeId": "tpl_a"}]"#,
            &graph,
        );
        assert_eq!(ids(&scores), vec!["tpl_a"]);
    }

    #[test]
    fn unparseable_answer_is_empty_not_error() {
        let graph = graph();
        assert!(parse_selection("I think you want a database node.", &graph).is_empty());
        assert!(parse_selection("   ", &graph).is_empty());
    }

    #[test]
    fn scores_clamped_and_reasons_normalized() {
        let graph = graph();
        let scores = parse_selection(
            r#"[{"nodeId": "tpl_a", "score": 250, "reasons": "only one"},
                {"nodeId": "tpl_b", "score": -4},
                {"nodeId": "tpl_c", "score": "66"}]"#,
            &graph,
        );
        let by_id = |id: &str| scores.iter().find(|s| s.node_id == id).expect("present");
        assert_eq!(by_id("tpl_a").score, 100);
        assert_eq!(by_id("tpl_a").reasons, vec!["only one"]);
        assert_eq!(by_id("tpl_b").score, 1);
        assert_eq!(by_id("tpl_c").score, 66);
    }

    #[test]
    fn ordered_by_sequence_then_score() {
        let graph = graph();
        let scores = parse_selection(
            r#"[{"nodeId": "tpl_a", "score": 10},
                {"nodeId": "tpl_b", "score": 50, "sequence": 2},
                {"nodeId": "tpl_c", "score": 90, "sequence": 1}]"#,
            &graph,
        );
        assert_eq!(ids(&scores), vec!["tpl_c", "tpl_b", "tpl_a"]);
    }

    #[test]
    fn equal_keys_keep_model_order() {
        let graph = graph();
        let scores = parse_selection(
            r#"[{"nodeId": "tpl_b", "score": 50}, {"nodeId": "tpl_a", "score": 50}]"#,
            &graph,
        );
        assert_eq!(ids(&scores), vec!["tpl_b", "tpl_a"]);
    }

    #[test]
    fn repeated_ids_keep_first_after_ordering() {
        let graph = graph();
        let scores = parse_selection(
            r#"[{"nodeId": "tpl_a", "score": 40, "sequence": 3},
                {"nodeId": "tpl_a", "score": 80, "sequence": 1, "role": "source"}]"#,
            &graph,
        );
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 80);
        assert_eq!(scores[0].metadata.role.as_deref(), Some("source"));
    }

    #[tokio::test]
    async fn empty_candidates_fail() {
        let graph = graph();
        let (selector, llm) = selector(ScriptedLlmBackend::new());
        let outcome = selector
            .try_select(&graph, &[], "anything", &WorkflowIntent::minimal())
            .await;
        assert!(matches!(outcome, StageOutcome::Failed(_)));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn raw_prefix_offered_when_retrieval_is_empty() {
        let graph = graph();
        let (selector, llm) = selector(
            ScriptedLlmBackend::new().reply(r#"[{"nodeId": "tpl_b", "score": 60}]"#),
        );
        let outcome = selector
            .try_select(&graph, &graph.candidates(), "zzz qqq", &WorkflowIntent::minimal())
            .await;

        let selection = outcome.ready().expect("ready");
        assert_eq!(selection.tier, RetrievalTier::RawPrefix);
        assert_eq!(selection.candidate_count, 3);
        assert_eq!(ids(&selection.scores), vec!["tpl_b"]);
        assert!(llm.prompts()[0].contains("id: tpl_a"));
    }

    #[tokio::test]
    async fn model_failure_is_failed_and_select_is_empty() {
        let graph = graph();
        let (selector, _) = selector(ScriptedLlmBackend::new().fail(LlmError::Timeout).fail(LlmError::Timeout));
        let candidates = graph.candidates();

        let outcome = selector
            .try_select(&graph, &candidates, "tpl", &WorkflowIntent::minimal())
            .await;
        match outcome {
            StageOutcome::Failed(report) => {
                assert!(report.to_string().contains("model invocation failed during selection"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        let scores = selector
            .select(&graph, &candidates, "tpl", &WorkflowIntent::minimal())
            .await;
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn all_dropped_is_no_valid_selection() {
        let graph = graph();
        let (selector, _) = selector(ScriptedLlmBackend::new().reply(r#"[{"nodeId": "ghost"}]"#));
        let outcome = selector
            .try_select(&graph, &graph.candidates(), "tpl", &WorkflowIntent::minimal())
            .await;
        match outcome {
            StageOutcome::Failed(report) => {
                assert!(report.to_string().contains("no valid nodes selected"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_array_is_empty_outcome() {
        let graph = graph();
        let (selector, _) = selector(ScriptedLlmBackend::new().reply("[]"));
        let outcome = selector
            .try_select(&graph, &graph.candidates(), "tpl", &WorkflowIntent::minimal())
            .await;
        assert!(matches!(outcome, StageOutcome::Empty));
    }
}
