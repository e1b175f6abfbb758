//! Postgres-to-CSV export, from a snapshot file on disk to a wired design.

use flowsmith_ai::LlmError;
use flowsmith_ai::testing::{FixedEmbeddingBackend, ScriptedLlmBackend};
use flowsmith_designer::{
    ConnectionEdge, DegradationReason, DesignOutcome, DesignerConfig, Quality, RetrievalTier,
    WorkflowDesign, WorkflowDesigner,
};
use flowsmith_knowledge::{KnowledgeGraphStore, SnapshotConfig};
use serde_json::json;
use std::sync::Arc;

const REQUEST: &str = "fetch users from a postgres database and write them to a CSV file";

const INTENT: &str = r#"{
  "action": "export users",
  "services": ["postgresql", "csv"],
  "capabilities": ["database_connection", "sql_execution", "file_writing"],
  "dataFlow": ["connect_database", "execute_query", "write_file"]
}"#;

const SELECTION: &str = r#"```json
[
  {"nodeId": "tpl_csv_writer", "score": 92, "reasons": ["writes the CSV file"], "role": "sink", "sequence": 3},
  {"nodeId": "tpl_postgres", "score": 95, "reasons": ["connects to postgres", "runs the query"], "role": "source", "sequence": 1},
  {"nodeId": "tpl_mapper", "score": 70, "reasons": "shapes rows into columns", "role": "transform", "sequence": 2}
]
```"#;

fn snapshot_document() -> serde_json::Value {
    let port = |id: &str, direction: &str| json!({"id": id, "label": id, "type": direction});
    json!({
        "nodes": [
            {"id": "tpl_postgres", "attributes": {
                "type": "template", "title": "PostgreSQL Query", "category": "database",
                "description": "Connect to a PostgreSQL database and execute SQL",
                "tags": ["postgres", "sql"], "capabilities": ["database_connection", "sql_execution"],
                "inputs": [port("trigger-in", "input")],
                "outputs": [port("data-out", "output"), port("error-out", "output")],
                "properties": {"query": {"type": "code-editor", "defaultValue": "SELECT * FROM users"}},
                "embeddings": {"combined": [0.9, 0.1, 0.0]}
            }},
            {"id": "tpl_mapper", "attributes": {
                "type": "template", "title": "Field Mapper", "category": "transform",
                "tags": ["map", "transform"],
                "inputs": [port("data-in", "input")], "outputs": [port("data-out", "output")],
                "embeddings": {"combined": [0.6, 0.6, 0.0]}
            }},
            {"id": "tpl_csv_writer", "attributes": {
                "type": "template", "title": "CSV File Writer", "category": "file",
                "description": "Write rows to a CSV file", "tags": ["csv", "file"],
                "capabilities": ["file_writing"],
                "inputs": [port("data-in", "input")], "outputs": [port("data-out", "output")],
                "embeddings": {"title": [0.8, 0.3, 0.0]}
            }},
            {"id": "tpl_slack", "attributes": {
                "type": "template", "title": "Slack Message", "category": "communication",
                "inputs": [port("data-in", "input")],
                "embeddings": {"combined": [0.0, 0.0, 1.0]}
            }},
            {"id": "service:postgresql", "attributes": {"type": "service", "name": "PostgreSQL"}}
        ],
        "edges": [
            {"source": "tpl_postgres", "target": "tpl_mapper", "attributes": {"type": "CAN_CONNECT_TO", "sourcePort": "data-out", "targetPort": "data-in"}},
            {"source": "tpl_mapper", "target": "tpl_csv_writer", "attributes": {"type": "CAN_CONNECT_TO"}},
            {"source": "tpl_postgres", "target": "service:postgresql", "attributes": {"type": "INTEGRATES_WITH"}}
        ],
        "metadata": {"createdAt": "2026-03-01T00:00:00Z", "templateCount": 4, "version": "1.0.0"}
    })
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<KnowledgeGraphStore>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("knowledge-graph.json");
    std::fs::write(&path, snapshot_document().to_string()).expect("write snapshot");
    let store = KnowledgeGraphStore::from_config(&SnapshotConfig {
        path: Some(path),
        url: None,
    });
    Fixture {
        _dir: dir,
        store: Arc::new(store),
    }
}

async fn run(llm: Arc<ScriptedLlmBackend>, store: Arc<KnowledgeGraphStore>) -> WorkflowDesign {
    let designer = WorkflowDesigner::new(
        store,
        llm,
        Arc::new(FixedEmbeddingBackend::new(vec![1.0, 0.2, 0.0])),
        &DesignerConfig::default(),
    );
    match designer.design(REQUEST).await {
        DesignOutcome::Designed(design) => *design,
        DesignOutcome::NoRelevantNodes { reason } => panic!("no design: {reason}"),
    }
}

fn pairs(connections: &[ConnectionEdge]) -> Vec<(&str, &str)> {
    connections
        .iter()
        .map(|c| (c.from.as_str(), c.to.as_str()))
        .collect()
}

#[tokio::test]
async fn postgres_to_csv_is_designed_and_wired() {
    let fixture = fixture();
    let llm = Arc::new(
        ScriptedLlmBackend::new()
            .reply(INTENT)
            .reply(SELECTION)
            .reply(r#"{"keep": ["tpl_postgres", "tpl_mapper", "tpl_csv_writer"]}"#)
            .reply(
                r#"[
                  {"from": "tpl_postgres.data-out", "to": "tpl_mapper.data-in", "confidence": 0.9, "reason": "rows"},
                  {"from": "tpl_mapper.data-out", "to": "tpl_csv_writer.data-in", "reason": "mapped rows"},
                  {"from": "tpl_csv_writer.data-out", "to": "tpl_slack.data-in", "confidence": 0.4}
                ]"#,
            ),
    );

    let design = run(Arc::clone(&llm), Arc::clone(&fixture.store)).await;

    let prompts = llm.prompts();
    let selection_prompt = &prompts[1];
    assert!(selection_prompt.contains("id: tpl_postgres"));
    assert!(selection_prompt.contains("id: tpl_csv_writer"));
    assert!(!selection_prompt.contains("id: tpl_slack"));
    assert!(selection_prompt.contains("services: PostgreSQL"));

    let ids: Vec<&str> = design.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["tpl_postgres", "tpl_mapper", "tpl_csv_writer"]);
    assert_eq!(design.nodes[0].config.get("query"), Some(&json!("SELECT * FROM users")));

    assert_eq!(
        pairs(&design.connections),
        vec![("tpl_postgres", "tpl_mapper"), ("tpl_mapper", "tpl_csv_writer")]
    );
    assert_eq!(design.connections.last().map(|c| c.to.as_str()), Some("tpl_csv_writer"));
    assert!((design.connections[1].confidence - 0.8).abs() < f32::EPSILON);

    assert_eq!(design.metadata.retrieval_tier, RetrievalTier::Semantic);
    assert_eq!(design.metadata.candidate_count, 3);
    assert_eq!(design.metadata.intent.services, vec!["postgresql", "csv"]);
    assert_eq!(design.metadata.quality, Quality::Complete);
    assert!(
        design
            .metadata
            .warnings
            .iter()
            .any(|w| w.contains("tpl_slack") && w.contains("not in the selection"))
    );
    assert_eq!(
        design.metadata.explanation.lines().next(),
        Some("PostgreSQL Query (score 95): connects to postgres; runs the query")
    );
}

#[tokio::test]
async fn postgres_to_csv_falls_back_to_a_chain() {
    let fixture = fixture();
    let llm = Arc::new(
        ScriptedLlmBackend::new()
            .reply(INTENT)
            .reply(SELECTION)
            .reply("I would keep everything.")
            .fail(LlmError::RequestFailed {
                reason: "503 Service Unavailable".to_string(),
            }),
    );

    let design = run(llm, fixture.store).await;

    assert_eq!(
        pairs(&design.connections),
        vec![("tpl_postgres", "tpl_mapper"), ("tpl_mapper", "tpl_csv_writer")]
    );
    assert!(design.connections.iter().all(|c| (c.confidence - 0.6).abs() < f32::EPSILON));
    assert_eq!(
        design.metadata.quality,
        Quality::Degraded {
            reasons: vec![
                DegradationReason::UndeduplicatedSelection,
                DegradationReason::FallbackConnections,
            ]
        }
    );
}
