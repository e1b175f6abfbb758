//! Turning a free-text request into a structured intent.

use crate::lenient::StringOrList;
use flowsmith_ai::response::parse_json_object;
use flowsmith_ai::{LlmBackend, LlmCall};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Action used when nothing better is known.
pub const DEFAULT_ACTION: &str = "workflow";

const SYSTEM_PROMPT: &str = "You analyze automation requests. Reply with JSON only.";

/// What the user wants the workflow to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowIntent {
    pub action: String,
    pub services: Vec<String>,
    pub capabilities: Vec<String>,
    pub data_flow: Vec<String>,
}

impl Default for WorkflowIntent {
    fn default() -> Self {
        Self::minimal()
    }
}

impl WorkflowIntent {
    /// The intent used when extraction fails.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            action: DEFAULT_ACTION.to_string(),
            services: Vec::new(),
            capabilities: Vec::new(),
            data_flow: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIntent {
    #[serde(default)]
    action: StringOrList,
    #[serde(default)]
    services: StringOrList,
    #[serde(default)]
    capabilities: StringOrList,
    #[serde(default, alias = "data_flow")]
    data_flow: StringOrList,
}

impl From<RawIntent> for WorkflowIntent {
    fn from(raw: RawIntent) -> Self {
        let action = raw.action.into_vec().join(" ");
        Self {
            action: if action.is_empty() {
                DEFAULT_ACTION.to_string()
            } else {
                action
            },
            services: raw.services.into_vec(),
            capabilities: raw.capabilities.into_vec(),
            data_flow: raw.data_flow.into_vec(),
        }
    }
}

/// Extracts a [`WorkflowIntent`] with a single model call.
#[derive(Clone)]
pub struct IntentExtractor {
    llm: Arc<dyn LlmBackend>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl IntentExtractor {
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

    /// Extracts the intent. Never fails: any model or parse problem yields
    /// [`WorkflowIntent::minimal`].
    #[tracing::instrument(skip_all)]
    pub async fn extract(&self, request: &str) -> WorkflowIntent {
        let result = LlmCall::new("intent", intent_prompt(request))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout)
            .invoke(self.llm.as_ref())
            .await;

        let content = match result {
            Ok(call) => call.content,
            Err(e) => {
                tracing::warn!(error = %e, "intent extraction failed, using minimal intent");
                return WorkflowIntent::minimal();
            }
        };

        let intent = parse_intent(&content);
        tracing::info!(
            action = %intent.action,
            services = intent.services.len(),
            capabilities = intent.capabilities.len(),
            "intent extracted"
        );
        intent
    }
}

/// Parses a model answer into an intent, falling back to the minimal one.
#[must_use]
pub fn parse_intent(content: &str) -> WorkflowIntent {
    let map = match parse_json_object(content) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "intent answer unparseable, using minimal intent");
            return WorkflowIntent::minimal();
        }
    };

    match serde_json::from_value::<RawIntent>(JsonValue::Object(map)) {
        Ok(raw) => raw.into(),
        Err(e) => {
            tracing::warn!(error = %e, "intent answer has unexpected shape, using minimal intent");
            WorkflowIntent::minimal()
        }
    }
}

fn intent_prompt(request: &str) -> String {
    format!(
        r#"Extract the intent of this automation request.

Request: "{request}"

Return strict JSON with exactly these keys:
- "action": what the workflow does, in a few words
- "services": external systems or products mentioned
- "capabilities": operations needed (query, transform, notify, ...)
- "dataFlow": the steps data passes through, in order

Example
Request: "When a GitHub issue is labeled bug, post it to Slack"
Answer: {{"action": "notify on labeled issues", "services": ["github", "slack"], "capabilities": ["webhook trigger", "filter", "send message"], "dataFlow": ["github issue event", "filter by label", "slack message"]}}

Answer with the JSON object only."#
    )
}
