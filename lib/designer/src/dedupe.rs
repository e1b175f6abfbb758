//! Removing redundant picks from a selection.

use crate::lenient::non_blank;
use crate::selection::RelevanceScore;
use flowsmith_ai::response::{parse_json_array, parse_json_object};
use flowsmith_ai::{LlmBackend, LlmCall, ResponseError};
use flowsmith_knowledge::KnowledgeGraph;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Categories whose nodes legitimately appear several times in one
/// workflow.
pub const PROTECTED_CATEGORIES: &[&str] = &[
    "branch / conditional nodes",
    "math operators",
    "logic gates",
    "aggregators",
    "filters and transforms",
    "script nodes",
];

const SYSTEM_PROMPT: &str = "You remove duplicate nodes from workflow designs. Reply with JSON only.";

/// What the filter did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeStatus {
    /// The model's retain list was applied.
    Applied,
    /// Nothing to compare: zero or one node.
    Skipped,
    /// The model could not be used; the selection passed through untouched.
    FailedOpen,
}

/// A selection after deduplication.
#[derive(Debug, Clone)]
pub struct DedupeOutcome {
    pub selection: Vec<RelevanceScore>,
    pub status: DedupeStatus,
}

/// Reads the retain list from a model answer.
///
/// Accepts an array of ids, an array of `{nodeId}` / `{id}` objects, or
/// an object with a `keep` array.
///
/// # Errors
///
/// Returns the parse error when no retain list can be recovered.
pub fn parse_retained(content: &str) -> Result<Vec<String>, ResponseError> {
    let keep = parse_json_object(content)
        .ok()
        .and_then(|mut map| match map.remove("keep") {
            Some(JsonValue::Array(items)) => Some(items),
            _ => None,
        });
    let items = match keep {
        Some(items) => items,
        None => parse_json_array(content)?,
    };

    Ok(items
        .iter()
        .filter_map(|item| match item {
            JsonValue::String(_) => non_blank(Some(item)),
            JsonValue::Object(map) => non_blank(map.get("nodeId")).or_else(|| non_blank(map.get("id"))),
            _ => None,
        })
        .collect())
}

/// Keeps exactly the retained ids, in selection order. When the selection
/// repeats an id, the higher-scored entry survives.
#[must_use]
pub fn apply_retained(selection: &[RelevanceScore], retained: &[String]) -> Vec<RelevanceScore> {
    let retained: HashSet<&str> = retained.iter().map(String::as_str).collect();

    let mut best: HashMap<&str, &RelevanceScore> = HashMap::new();
    for entry in selection.iter().filter(|e| retained.contains(e.node_id.as_str())) {
        best.entry(entry.node_id.as_str())
            .and_modify(|current| {
                if entry.score > current.score {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    let mut emitted = HashSet::new();
    selection
        .iter()
        .filter(|e| emitted.insert(e.node_id.as_str()))
        .filter_map(|e| best.get(e.node_id.as_str()).map(|winner| (*winner).clone()))
        .collect()
}

/// Asks the model which selected nodes are redundant.
#[derive(Clone)]
pub struct DeduplicationFilter {
    llm: Arc<dyn LlmBackend>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl DeduplicationFilter {
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

    /// Deduplicates, returning the original selection on any failure.
    pub async fn dedupe(&self, graph: &KnowledgeGraph, selection: Vec<RelevanceScore>) -> Vec<RelevanceScore> {
        self.try_dedupe(graph, selection).await.selection
    }

    /// Deduplicates and reports whether the model's answer was applied.
    #[tracing::instrument(skip_all, fields(selected = selection.len()))]
    pub async fn try_dedupe(&self, graph: &KnowledgeGraph, selection: Vec<RelevanceScore>) -> DedupeOutcome {
        if selection.len() <= 1 {
            return DedupeOutcome {
                selection,
                status: DedupeStatus::Skipped,
            };
        }

        let result = LlmCall::new("dedupe", dedupe_prompt(graph, &selection))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout)
            .invoke(self.llm.as_ref())
            .await;

        let content = match result {
            Ok(call) => call.content,
            Err(e) => {
                tracing::warn!(error = %e, "deduplication unavailable, keeping selection");
                return fail_open(selection);
            }
        };

        let retained = match parse_retained(&content) {
            Ok(retained) => retained,
            Err(e) => {
                tracing::warn!(error = %e, "deduplication answer unparseable, keeping selection");
                return fail_open(selection);
            }
        };

        let kept = apply_retained(&selection, &retained);
        if kept.is_empty() {
            tracing::warn!(
                retained = retained.len(),
                "deduplication kept nothing from the selection, keeping selection"
            );
            return fail_open(selection);
        }

        tracing::info!(before = selection.len(), after = kept.len(), "selection deduplicated");
        DedupeOutcome {
            selection: kept,
            status: DedupeStatus::Applied,
        }
    }
}

fn fail_open(selection: Vec<RelevanceScore>) -> DedupeOutcome {
    DedupeOutcome {
        selection,
        status: DedupeStatus::FailedOpen,
    }
}

fn dedupe_prompt(graph: &KnowledgeGraph, selection: &[RelevanceScore]) -> String {
    let mut listing = String::new();
    for entry in selection {
        let template = graph.template(&entry.node_id);
        listing.push_str(&format!("- nodeId: {}\n", entry.node_id));
        if let Some(template) = template {
            listing.push_str(&format!("  title: {}\n", template.title));
            listing.push_str(&format!("  description: {}\n", template.description));
            listing.push_str(&format!("  category: {}\n", template.category));
        }
        listing.push_str(&format!("  type: {}\n", entry.node_id));
        if let Some(reason) = entry.reasons.first() {
            listing.push_str(&format!("  selected because: {reason}\n"));
        }
    }

    let protected = PROTECTED_CATEGORIES
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"These nodes were selected for one workflow. Some may be true duplicates: two nodes doing the same job for the same service.

{listing}
Never remove nodes from these categories just because they repeat, a workflow often needs several of them:
{protected}

Return the nodeIds to keep as a JSON array of strings, for example ["node_a", "node_b"]."#
    )
}
