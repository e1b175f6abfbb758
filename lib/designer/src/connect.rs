//! Deriving directed connections between selected nodes.

use crate::error::DesignError;
use crate::lenient::{non_blank, number};
use crate::selection::RelevanceScore;
use flowsmith_ai::response::parse_json_array;
use flowsmith_ai::{LlmBackend, LlmCall};
use flowsmith_knowledge::{KnowledgeGraph, PortDirection, TemplateNode, TemplatePort};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Confidence given to model connections that state none.
pub const DEFAULT_CONFIDENCE: f32 = 0.8;

/// Confidence of every connection in the sequential fallback chain.
pub const FALLBACK_CONFIDENCE: f32 = 0.6;

const SYSTEM_PROMPT: &str = "You wire workflow nodes together through their ports. Reply with a JSON array only.";

/// A directed connection between two selected nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub from: String,
    pub to: String,
    /// 0..=1.
    pub confidence: f32,
}

/// How a plan's connections were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionSource {
    /// Validated model proposals.
    Model,
    /// Consecutive nodes chained in sequence order.
    SequentialFallback,
    /// Fewer than two nodes; nothing to connect.
    NotRequired,
}

/// Why a proposed connection was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    MissingEndpoint,
    OutsideSelection { node_id: String },
    SelfLoop,
    Duplicate,
    WrongDirection { node_id: String, port: String },
    IncompatiblePorts { from_port: String, to_port: String },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEndpoint => write!(f, "missing endpoint"),
            Self::OutsideSelection { node_id } => write!(f, "node {node_id} is not in the selection"),
            Self::SelfLoop => write!(f, "self-loop"),
            Self::Duplicate => write!(f, "duplicate connection"),
            Self::WrongDirection { node_id, port } => {
                write!(f, "port {port} on {node_id} points the wrong way")
            }
            Self::IncompatiblePorts { from_port, to_port } => {
                write!(f, "port {from_port} cannot feed {to_port}")
            }
        }
    }
}

/// A proposal that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedConnection {
    pub from: String,
    pub to: String,
    pub reason: RejectionReason,
}

/// The synthesized connections and how they came about.
#[derive(Debug, Clone)]
pub struct ConnectionPlan {
    pub connections: Vec<ConnectionEdge>,
    pub source: ConnectionSource,
    pub rejected: Vec<RejectedConnection>,
}

impl ConnectionPlan {
    /// The model answered, but every proposal was rejected.
    #[must_use]
    pub fn failure(&self) -> Option<DesignError> {
        (self.source == ConnectionSource::Model && self.connections.is_empty()).then(|| {
            DesignError::NoValidConnections {
                rejected: self.rejected.len(),
            }
        })
    }
}

/// Chains nodes in ascending sequence order (unsequenced last, ties keep
/// selection order) at [`FALLBACK_CONFIDENCE`].
#[must_use]
pub fn sequential_fallback(selection: &[RelevanceScore]) -> Vec<ConnectionEdge> {
    let mut ordered: Vec<&RelevanceScore> = selection.iter().collect();
    ordered.sort_by_key(|entry| entry.sequence_or_default());

    ordered
        .windows(2)
        .map(|pair| ConnectionEdge {
            from: pair[0].node_id.clone(),
            to: pair[1].node_id.clone(),
            confidence: FALLBACK_CONFIDENCE,
        })
        .collect()
}

/// Splits `nodeId.portName` on the first `.`.
fn split_endpoint(endpoint: &str) -> (&str, Option<&str>) {
    match endpoint.split_once('.') {
        Some((node, port)) if !port.trim().is_empty() => (node.trim(), Some(port.trim())),
        Some((node, _)) => (node.trim(), None),
        None => (endpoint.trim(), None),
    }
}

fn find_port<'t>(ports: &'t [TemplatePort], port_id: &str) -> Option<&'t TemplatePort> {
    ports.iter().find(|p| p.id == port_id)
}

/// Checks a named port against the direction it is used in. Unknown ports
/// and unresolvable templates pass.
fn direction_ok(template: Option<&TemplateNode>, port: Option<&str>, used_as: PortDirection) -> bool {
    let (Some(template), Some(port)) = (template, port) else {
        return true;
    };
    let right = match used_as {
        PortDirection::Output => &template.outputs,
        PortDirection::Input => &template.inputs,
    };
    find_port(right, port).is_some() || template.port(port).is_none()
}

/// Validates model proposals against the selection.
#[must_use]
pub fn validate_connections(
    proposals: &[JsonValue],
    selection: &[RelevanceScore],
    graph: &KnowledgeGraph,
) -> (Vec<ConnectionEdge>, Vec<RejectedConnection>) {
    let selected: HashSet<&str> = selection.iter().map(|s| s.node_id.as_str()).collect();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for proposal in proposals {
        let from_raw = non_blank(proposal.get("from")).unwrap_or_default();
        let to_raw = non_blank(proposal.get("to")).unwrap_or_default();
        let (from, from_port) = split_endpoint(&from_raw);
        let (to, to_port) = split_endpoint(&to_raw);

        let reason = check(graph, &selected, &seen, (from, from_port), (to, to_port));
        if let Some(reason) = reason {
            tracing::debug!(from = %from_raw, to = %to_raw, reason = %reason, "rejecting proposed connection");
            rejected.push(RejectedConnection {
                from: from_raw.clone(),
                to: to_raw.clone(),
                reason,
            });
            continue;
        }

        seen.insert((from.to_string(), to.to_string()));
        let confidence = proposal
            .get("confidence")
            .and_then(number)
            .map_or(DEFAULT_CONFIDENCE, |c| (c as f32).clamp(0.0, 1.0));
        accepted.push(ConnectionEdge {
            from: from.to_string(),
            to: to.to_string(),
            confidence,
        });
    }

    (accepted, rejected)
}

fn check(
    graph: &KnowledgeGraph,
    selected: &HashSet<&str>,
    seen: &HashSet<(String, String)>,
    (from, from_port): (&str, Option<&str>),
    (to, to_port): (&str, Option<&str>),
) -> Option<RejectionReason> {
    if from.is_empty() || to.is_empty() {
        return Some(RejectionReason::MissingEndpoint);
    }
    for node_id in [from, to] {
        if !selected.contains(node_id) {
            return Some(RejectionReason::OutsideSelection {
                node_id: node_id.to_string(),
            });
        }
    }
    if from == to {
        return Some(RejectionReason::SelfLoop);
    }
    if seen.contains(&(from.to_string(), to.to_string())) {
        return Some(RejectionReason::Duplicate);
    }

    let from_template = graph.template(from);
    let to_template = graph.template(to);
    for (node_id, template, port, used_as) in [
        (from, from_template, from_port, PortDirection::Output),
        (to, to_template, to_port, PortDirection::Input),
    ] {
        if !direction_ok(template, port, used_as) {
            return Some(RejectionReason::WrongDirection {
                node_id: node_id.to_string(),
                port: port.unwrap_or_default().to_string(),
            });
        }
    }

    let source = from_template.zip(from_port).and_then(|(t, p)| find_port(&t.outputs, p));
    let target = to_template.zip(to_port).and_then(|(t, p)| find_port(&t.inputs, p));
    if let (Some(source), Some(target)) = (source, target) {
        if !source.can_feed(target) {
            return Some(RejectionReason::IncompatiblePorts {
                from_port: source.id.clone(),
                to_port: target.id.clone(),
            });
        }
    }

    None
}

/// Asks the model to wire the selection.
#[derive(Clone)]
pub struct ConnectionSynthesizer {
    llm: Arc<dyn LlmBackend>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl ConnectionSynthesizer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmBackend>) -> Self {
        Self {
            llm,
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

    /// Returns the connections only.
    pub async fn connect(&self, graph: &KnowledgeGraph, selection: &[RelevanceScore]) -> Vec<ConnectionEdge> {
        self.synthesize(graph, selection).await.connections
    }

    /// Builds a connection plan.
    ///
    /// Falls back to [`sequential_fallback`] when the model call fails or
    /// its answer cannot be parsed.
    #[tracing::instrument(skip_all, fields(selected = selection.len()))]
    pub async fn synthesize(&self, graph: &KnowledgeGraph, selection: &[RelevanceScore]) -> ConnectionPlan {
        if selection.len() < 2 {
            return ConnectionPlan {
                connections: Vec::new(),
                source: ConnectionSource::NotRequired,
                rejected: Vec::new(),
            };
        }

        let result = LlmCall::new("connections", connection_prompt(graph, selection))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout)
            .invoke(self.llm.as_ref())
            .await;

        let proposals = match result {
            Ok(call) => match parse_json_array(&call.content) {
                Ok(proposals) if proposals.is_empty() => {
                    tracing::warn!("model proposed no connections, chaining in sequence");
                    return fallback(selection);
                }
                Ok(proposals) => proposals,
                Err(e) => {
                    tracing::warn!(error = %e, "connection answer unparseable, chaining in sequence");
                    return fallback(selection);
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "connection synthesis unavailable, chaining in sequence");
                return fallback(selection);
            }
        };

        let (connections, rejected) = validate_connections(&proposals, selection, graph);
        let plan = ConnectionPlan {
            connections,
            source: ConnectionSource::Model,
            rejected,
        };

        match plan.failure() {
            Some(error) => tracing::warn!(error = %error, "model proposed no usable connection"),
            None => tracing::info!(
                accepted = plan.connections.len(),
                rejected = plan.rejected.len(),
                "connections synthesized"
            ),
        }
        plan
    }
}

fn fallback(selection: &[RelevanceScore]) -> ConnectionPlan {
    ConnectionPlan {
        connections: sequential_fallback(selection),
        source: ConnectionSource::SequentialFallback,
        rejected: Vec::new(),
    }
}

fn describe_ports(ports: &[TemplatePort]) -> String {
    if ports.is_empty() {
        return "none".to_string();
    }
    ports
        .iter()
        .map(|p| match &p.data_type {
            Some(data_type) => format!("{} [{data_type}]", p.id),
            None => p.id.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn connection_prompt(graph: &KnowledgeGraph, selection: &[RelevanceScore]) -> String {
    let mut nodes = String::new();
    for entry in selection {
        nodes.push_str(&format!("- {}\n", entry.node_id));
        match graph.candidate(&entry.node_id) {
            Some(candidate) => {
                nodes.push_str(&format!("  title: {}\n", candidate.title()));
                nodes.push_str(&format!("  description: {}\n", candidate.description()));
                if !candidate.services.is_empty() {
                    nodes.push_str(&format!("  services: {}\n", candidate.services.join(", ")));
                }
                if !candidate.capabilities().is_empty() {
                    nodes.push_str(&format!("  capabilities: {}\n", candidate.capabilities().join(", ")));
                }
                nodes.push_str(&format!("  inputs: {}\n", describe_ports(candidate.inputs())));
                nodes.push_str(&format!("  outputs: {}\n", describe_ports(candidate.outputs())));
            }
            None => {
                if let Some(reason) = entry.reasons.first() {
                    nodes.push_str(&format!("  selected because: {reason}\n"));
                }
            }
        }
        if let Some(role) = &entry.metadata.role {
            nodes.push_str(&format!("  role: {role}\n"));
        }
        if let Some(sequence) = entry.metadata.sequence {
            nodes.push_str(&format!("  sequence: {sequence}\n"));
        }
    }

    let ids: Vec<&str> = selection.iter().map(|s| s.node_id.as_str()).collect();
    let hints = graph
        .connection_hints(&ids)
        .into_iter()
        .map(|edge| match (edge.source_port(), edge.target_port()) {
            (Some(out), Some(inp)) => format!("- {}.{out} -> {}.{inp}", edge.source, edge.target),
            _ => format!("- {} -> {}", edge.source, edge.target),
        })
        .collect::<Vec<_>>();
    let hints = if hints.is_empty() {
        "none".to_string()
    } else {
        hints.join("\n")
    };

    format!(
        r#"Connect these nodes into one complete workflow.

Nodes:
{nodes}
Known compatible pairs (hints, you may ignore them):
{hints}

Port rules:
- Connect an output port to a compatible input port only.
- Trigger outputs feed trigger-in ports.
- Data outputs feed data-in ports.
- Wire error outputs to an error-handling or logging node's input.
- Only use the node ids listed above.

Return a JSON array. One object per connection:
{{"from": "<nodeId>.<outputPort>", "to": "<nodeId>.<inputPort>", "confidence": <0-1>, "reason": "<why>"}}

Answer with the JSON array only."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsmith_ai::LlmError;
    use flowsmith_ai::testing::ScriptedLlmBackend;
    use flowsmith_knowledge::{
        EdgeType, GraphEdge, GraphNode, KnowledgeGraphSnapshot, SnapshotMetadata, SnapshotOrigin,
    };
    use serde_json::json;

    fn graph() -> KnowledgeGraph {
        let pg = TemplateNode::new("PostgreSQL", "database")
            .with_input(TemplatePort::input("trigger-in"))
            .with_output(TemplatePort::output("data-out"))
            .with_output(TemplatePort::output("error-out"));
        let csv = TemplateNode::new("CSV Writer", "file")
            .with_input(TemplatePort::input("data-in"))
            .with_output(TemplatePort::output("data-out"));
        let log = TemplateNode::new("Logger", "utility").with_input(TemplatePort::input("data-in"));
        KnowledgeGraph::from_snapshot(
            KnowledgeGraphSnapshot {
                nodes: vec![
                    GraphNode::template("tpl_pg", pg),
                    GraphNode::template("tpl_csv", csv),
                    GraphNode::template("tpl_log", log),
                ],
                edges: vec![GraphEdge::new("tpl_pg", "tpl_csv", EdgeType::CanConnectTo)
                    .with_ports("data-out", "data-in")],
                metadata: SnapshotMetadata::now(3),
            },
            SnapshotOrigin::InMemory,
        )
    }

    fn selection() -> Vec<RelevanceScore> {
        vec![
            RelevanceScore::new("tpl_pg", 90).with_sequence(1),
            RelevanceScore::new("tpl_csv", 80).with_sequence(2),
            RelevanceScore::new("tpl_log", 60),
        ]
    }

    fn pairs(edges: &[ConnectionEdge]) -> Vec<(&str, &str)> {
        edges.iter().map(|e| (e.from.as_str(), e.to.as_str())).collect()
    }

    fn synthesizer(llm: ScriptedLlmBackend) -> (ConnectionSynthesizer, Arc<ScriptedLlmBackend>) {
        let llm = Arc::new(llm);
        (ConnectionSynthesizer::new(llm.clone()), llm)
    }

    #[test]
    fn fallback_chains_three_nodes() {
        let p = RelevanceScore::new("P", 50).with_sequence(1);
        let q = RelevanceScore::new("Q", 50).with_sequence(2);
        let r = RelevanceScore::new("R", 50).with_sequence(3);
        let edges = sequential_fallback(&[r, p, q]);
        assert_eq!(pairs(&edges), vec![("P", "Q"), ("Q", "R")]);
        assert!(edges.iter().all(|e| (e.confidence - 0.6).abs() < f32::EPSILON));
    }

    #[test]
    fn fallback_puts_unsequenced_last_and_keeps_ties() {
        let edges = sequential_fallback(&[
            RelevanceScore::new("A", 50),
            RelevanceScore::new("B", 50).with_sequence(1),
            RelevanceScore::new("C", 50),
        ]);
        assert_eq!(pairs(&edges), vec![("B", "A"), ("A", "C")]);
        assert!(sequential_fallback(&[RelevanceScore::new("A", 1)]).is_empty());
    }

    #[test]
    fn endpoints_split_on_first_dot() {
        assert_eq!(split_endpoint("tpl_a.data-out"), ("tpl_a", Some("data-out")));
        assert_eq!(split_endpoint("tpl_a.out.v2"), ("tpl_a", Some("out.v2")));
        assert_eq!(split_endpoint("tpl_a"), ("tpl_a", None));
        assert_eq!(split_endpoint("tpl_a."), ("tpl_a", None));
    }

    #[test]
    fn validation_strips_ports_and_defaults_confidence() {
        let proposals = vec![
            json!({"from": "tpl_pg.data-out", "to": "tpl_csv.data-in"}),
            json!({"from": "tpl_pg.error-out", "to": "tpl_log.data-in", "confidence": 7}),
        ];
        let (accepted, rejected) = validate_connections(&proposals, &selection(), &graph());
        assert!(rejected.is_empty());
        assert_eq!(
            accepted,
            vec![
                ConnectionEdge { from: "tpl_pg".into(), to: "tpl_csv".into(), confidence: 0.8 },
                ConnectionEdge { from: "tpl_pg".into(), to: "tpl_log".into(), confidence: 1.0 },
            ]
        );
    }

    #[test]
    fn validation_rejects_outside_selection_loops_and_repeats() {
        let proposals = vec![
            json!({"from": "tpl_pg.data-out", "to": "tpl_s3.data-in"}),
            json!({"from": "tpl_csv", "to": "tpl_csv"}),
            json!({"from": "tpl_pg", "to": "tpl_csv"}),
            json!({"from": "tpl_pg.data-out", "to": "tpl_csv.data-in"}),
            json!({"to": "tpl_csv"}),
        ];
        let (accepted, rejected) = validate_connections(&proposals, &selection(), &graph());
        assert_eq!(pairs(&accepted), vec![("tpl_pg", "tpl_csv")]);
        let reasons: Vec<&RejectionReason> = rejected.iter().map(|r| &r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                &RejectionReason::OutsideSelection { node_id: "tpl_s3".into() },
                &RejectionReason::SelfLoop,
                &RejectionReason::Duplicate,
                &RejectionReason::MissingEndpoint,
            ]
        );
    }

    #[test]
    fn validation_rejects_wrong_direction_but_not_unknown_ports() {
        let proposals = vec![
            json!({"from": "tpl_csv.data-in", "to": "tpl_log.data-in"}),
            json!({"from": "tpl_pg.data-out", "to": "tpl_csv.data-out"}),
            json!({"from": "tpl_csv.rows", "to": "tpl_log.sink"}),
        ];
        let (accepted, rejected) = validate_connections(&proposals, &selection(), &graph());
        assert_eq!(pairs(&accepted), vec![("tpl_csv", "tpl_log")]);
        assert_eq!(
            rejected[0].reason,
            RejectionReason::WrongDirection { node_id: "tpl_csv".into(), port: "data-in".into() }
        );
        assert!(matches!(rejected[1].reason, RejectionReason::WrongDirection { .. }));
    }

    #[test]
    fn validation_rejects_incompatible_kinds() {
        let proposals = vec![json!({"from": "tpl_pg.data-out", "to": "tpl_pg.trigger-in"})];
        let selection = selection();
        let (_, rejected) = validate_connections(&proposals, &selection, &graph());
        assert_eq!(rejected[0].reason, RejectionReason::SelfLoop);

        let proposals = vec![json!({"from": "tpl_csv.data-out", "to": "tpl_pg.trigger-in"})];
        let (accepted, rejected) = validate_connections(&proposals, &selection, &graph());
        assert!(accepted.is_empty());
        assert!(matches!(rejected[0].reason, RejectionReason::IncompatiblePorts { .. }));
    }

    #[tokio::test]
    async fn model_plan_is_validated() {
        let (synth, llm) = synthesizer(ScriptedLlmBackend::new().reply(
            r#"```json
[{"from": "tpl_pg.data-out", "to": "tpl_csv.data-in", "confidence": 0.9, "reason": "rows"}]
```"#,
        ));
        let plan = synth.synthesize(&graph(), &selection()).await;
        assert_eq!(plan.source, ConnectionSource::Model);
        assert_eq!(pairs(&plan.connections), vec![("tpl_pg", "tpl_csv")]);
        assert!(plan.failure().is_none());
        assert!(llm.prompts()[0].contains("tpl_pg.data-out -> tpl_csv.data-in"));
    }

    #[tokio::test]
    async fn invocation_failure_chains_in_sequence() {
        let (synth, _) = synthesizer(ScriptedLlmBackend::new().fail(LlmError::Timeout));
        let plan = synth.synthesize(&graph(), &selection()).await;
        assert_eq!(plan.source, ConnectionSource::SequentialFallback);
        assert_eq!(pairs(&plan.connections), vec![("tpl_pg", "tpl_csv"), ("tpl_csv", "tpl_log")]);
    }

    #[tokio::test]
    async fn unparseable_answer_chains_in_sequence() {
        let (synth, _) = synthesizer(ScriptedLlmBackend::new().reply("connect them in order"));
        let edges = synth.connect(&graph(), &selection()).await;
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| (e.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON));
    }

    #[tokio::test]
    async fn all_rejected_is_empty_plan_not_fallback() {
        let (synth, _) = synthesizer(ScriptedLlmBackend::new().reply(r#"[{"from": "x", "to": "y"}]"#));
        let plan = synth.synthesize(&graph(), &selection()).await;
        assert_eq!(plan.source, ConnectionSource::Model);
        assert!(plan.connections.is_empty());
        assert_eq!(plan.failure(), Some(DesignError::NoValidConnections { rejected: 1 }));
    }

    #[tokio::test]
    async fn empty_answer_chains_in_sequence() {
        let (synth, _) = synthesizer(ScriptedLlmBackend::new().reply("[]"));
        let plan = synth.synthesize(&graph(), &selection()).await;
        assert_eq!(plan.source, ConnectionSource::SequentialFallback);
        assert_eq!(pairs(&plan.connections), vec![("tpl_pg", "tpl_csv"), ("tpl_csv", "tpl_log")]);
        assert!(plan.failure().is_none());
    }

    #[tokio::test]
    async fn prompt_lists_ports_and_capabilities() {
        let mut pg = TemplateNode::new("PostgreSQL", "database").with_output(TemplatePort::output("data-out"));
        pg.capabilities = vec!["query".to_string()];
        let csv = TemplateNode::new("CSV Writer", "file").with_input(TemplatePort::input("data-in"));
        let graph = KnowledgeGraph::from_snapshot(
            KnowledgeGraphSnapshot {
                nodes: vec![
                    GraphNode::template("tpl_pg", pg),
                    GraphNode::template("tpl_csv", csv),
                    GraphNode::service("service:postgres", "PostgreSQL"),
                ],
                edges: vec![GraphEdge::new("tpl_pg", "service:postgres", EdgeType::IntegratesWith)],
                metadata: SnapshotMetadata::now(2),
            },
            SnapshotOrigin::InMemory,
        );
        let (synth, llm) = synthesizer(ScriptedLlmBackend::new().reply("[]"));
        synth.synthesize(&graph, &selection()[..2]).await;

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("  services: PostgreSQL\n"));
        assert!(prompt.contains("  capabilities: query\n"));
        assert!(prompt.contains("  outputs: data-out\n"));
        assert!(prompt.contains("  inputs: data-in\n"));
    }

    #[tokio::test]
    async fn single_node_needs_no_model() {
        let (synth, llm) = synthesizer(ScriptedLlmBackend::new());
        let plan = synth.synthesize(&graph(), &selection()[..1]).await;
        assert_eq!(plan.source, ConnectionSource::NotRequired);
        assert!(plan.connections.is_empty());
        assert!(plan.failure().is_none());
        assert!(llm.prompts().is_empty());
    }
}
