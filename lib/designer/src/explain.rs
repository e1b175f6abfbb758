//! Human-readable rendering of a selection.

use crate::selection::RelevanceScore;
use flowsmith_knowledge::KnowledgeGraph;

/// Renders one line per selected node, in order:
/// `{title} (score {score}): {reasons joined by "; "}`, without the colon
/// when there are no reasons.
///
/// Titles come from the graph; unknown ids are shown as-is.
#[must_use]
pub fn explain(graph: &KnowledgeGraph, selection: &[RelevanceScore]) -> String {
    selection
        .iter()
        .map(|entry| {
            let title = graph
                .template(&entry.node_id)
                .map_or(entry.node_id.as_str(), |t| t.title.as_str());
            if entry.reasons.is_empty() {
                format!("{title} (score {})", entry.score)
            } else {
                format!("{title} (score {}): {}", entry.score, entry.reasons.join("; "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
