//! Per-request candidate projection of templates.

use crate::edge::EdgeType;
use crate::graph::KnowledgeGraph;
use crate::node::{TemplateEmbeddings, TemplateNode};
use crate::port::TemplatePort;

/// A template enriched with its graph neighbourhood.
///
/// Borrows from the graph it was projected from; candidates live for one
/// request.
#[derive(Debug, Clone)]
pub struct CandidateNode<'g> {
    pub id: &'g str,
    pub template: &'g TemplateNode,
    /// `CAN_CONNECT_TO` targets.
    pub connections: Vec<&'g str>,
    /// `INTEGRATES_WITH` targets, resolved to service names.
    pub services: Vec<String>,
}

impl<'g> CandidateNode<'g> {
    #[must_use]
    pub fn title(&self) -> &'g str {
        &self.template.title
    }

    #[must_use]
    pub fn description(&self) -> &'g str {
        &self.template.description
    }

    #[must_use]
    pub fn category(&self) -> &'g str {
        &self.template.category
    }

    #[must_use]
    pub fn tags(&self) -> &'g [String] {
        &self.template.tags
    }

    #[must_use]
    pub fn capabilities(&self) -> &'g [String] {
        &self.template.capabilities
    }

    #[must_use]
    pub fn inputs(&self) -> &'g [TemplatePort] {
        &self.template.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &'g [TemplatePort] {
        &self.template.outputs
    }

    #[must_use]
    pub fn embeddings(&self) -> &'g TemplateEmbeddings {
        &self.template.embeddings
    }
}

impl KnowledgeGraph {
    /// Projects every template into a candidate, in snapshot order.
    #[must_use]
    pub fn candidates(&self) -> Vec<CandidateNode<'_>> {
        self.templates()
            .map(|(id, template)| self.project(id, template))
            .collect()
    }

    /// Projects a single template.
    #[must_use]
    pub fn candidate(&self, node_id: &str) -> Option<CandidateNode<'_>> {
        let node = self.node(node_id)?;
        let template = node.as_template()?;
        Some(self.project(&node.id, template))
    }

    fn project<'g>(&'g self, id: &'g str, template: &'g TemplateNode) -> CandidateNode<'g> {
        CandidateNode {
            id,
            template,
            connections: self.targets_of(id, EdgeType::CanConnectTo),
            services: self
                .targets_of(id, EdgeType::IntegratesWith)
                .into_iter()
                .map(|service| self.service_name(service))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::edge::{EdgeType, GraphEdge};
    use crate::graph::{KnowledgeGraph, SnapshotOrigin};
    use crate::node::{GraphNode, TemplateNode};
    use crate::snapshot::{KnowledgeGraphSnapshot, SnapshotMetadata};

    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::from_snapshot(
            KnowledgeGraphSnapshot {
                nodes: vec![
                    GraphNode::template("tpl_slack", TemplateNode::new("Slack Message", "communication")),
                    GraphNode::template("tpl_filter", TemplateNode::new("Filter", "transform")),
                    GraphNode::service("service:slack", "Slack"),
                ],
                edges: vec![
                    GraphEdge::new("tpl_filter", "tpl_slack", EdgeType::CanConnectTo),
                    GraphEdge::new("tpl_slack", "service:slack", EdgeType::IntegratesWith),
                    GraphEdge::new("tpl_slack", "service:discord", EdgeType::IntegratesWith),
                ],
                metadata: SnapshotMetadata::now(2),
            },
            SnapshotOrigin::InMemory,
        )
    }

    #[test]
    fn candidates_cover_templates_only() {
        let graph = graph();
        let candidates = graph.candidates();
        let ids: Vec<&str> = candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["tpl_slack", "tpl_filter"]);
    }

    #[test]
    fn candidate_resolves_services_and_connections() {
        let graph = graph();
        let slack = graph.candidate("tpl_slack").expect("candidate");
        assert_eq!(slack.services, vec!["Slack"]);
        assert_eq!(slack.title(), "Slack Message");

        let filter = graph.candidate("tpl_filter").expect("candidate");
        assert_eq!(filter.connections, vec!["tpl_slack"]);
        assert!(filter.services.is_empty());
    }

    #[test]
    fn dangling_service_edge_is_not_a_service() {
        let graph = graph();
        assert_eq!(graph.dangling_edges(), 1);
        assert!(graph.candidate("service:slack").is_none());
    }
}
