//! The generative model seam.
//!
//! Provides a unified interface for the generative model collaborator.
//! The pipeline only ever sends a prompt and reads back text; no streaming
//! or function-calling contract is assumed.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Wire protocol spoken by the configured model endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// api.openai.com; an API key is mandatory.
    OpenAi,
    #[default]
    OpenAiCompatible,
    /// Local Ollama instance (through its OpenAI-compatible endpoint).
    Ollama,
    /// A plain endpoint that takes a prompt and answers with text.
    PromptEndpoint,
}

impl LlmProvider {
    /// Returns the provider name used in logs and errors.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenAiCompatible => "openai_compatible",
            Self::Ollama => "ollama",
            Self::PromptEndpoint => "prompt_endpoint",
        }
    }
}

/// The `[llm]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmBackendConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// For chat-completions providers, the URL up to and including `/v1`.
    /// For `prompt_endpoint`, the full URL that is POSTed to.
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Used when a call does not set its own temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl LlmBackendConfig {
    /// Ollama through its OpenAI-compatible `/v1` endpoint.
    #[must_use]
    pub fn ollama(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Ollama,
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// api.openai.com with the given key.
    #[must_use]
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: Some(api_key.into()),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// One prompt for the model. Stages build these through [`LlmCall`](crate::LlmCall).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// A bare prompt, with provider defaults for everything else.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: None,
        }
    }

    /// Adds a system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Raw output of a generative model call.
///
/// Collaborators answer either with a bare string or with an object carrying
/// a `content` field; both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelOutput {
    /// Plain text.
    Text(String),
    /// A message object.
    Message { content: String },
}

impl ModelOutput {
    /// Returns the text carried by either shape.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Message { content: text } => text,
        }
    }
}

/// The model's answer, still unparsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// As reported by the endpoint, which may differ from the configured name.
    pub model: String,
}

impl LlmResponse {
    /// Creates a response from raw model output.
    #[must_use]
    pub fn from_output(output: ModelOutput, model: impl Into<String>) -> Self {
        Self {
            content: output.into_text(),
            usage: TokenUsage::default(),
            model: model.into(),
        }
    }
}

/// Token counts, when the collaborator reports them. Zero otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The generative model collaborator: prompt in, text out.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Sends one prompt and waits for the whole answer.
    ///
    /// # Errors
    ///
    /// Any transport, status or decoding failure.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn provider(&self) -> LlmProvider;

    /// Configured model name, for logs.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_request_builder() {
        let request = LlmRequest::new("Pick nodes")
            .with_system("You design workflows.")
            .with_temperature(0.2);

        assert_eq!(request.prompt, "Pick nodes");
        assert_eq!(request.system.as_deref(), Some("You design workflows."));
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn model_output_accepts_bare_string() {
        let output: ModelOutput = serde_json::from_str(r#""[1, 2]""#).expect("deserialize");
        assert_eq!(output.into_text(), "[1, 2]");
    }

    #[test]
    fn model_output_accepts_content_object() {
        let output: ModelOutput =
            serde_json::from_str(r#"{"content": "hello", "role": "assistant"}"#)
                .expect("deserialize");
        assert_eq!(output.into_text(), "hello");
    }

    #[test]
    fn backend_config_defaults_provider() {
        let config: LlmBackendConfig = serde_json::from_value(serde_json::json!({
            "base_url": "http://localhost:8080/v1",
            "model": "local"
        }))
        .expect("deserialize");

        assert_eq!(config.provider, LlmProvider::OpenAiCompatible);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn ollama_config() {
        let config = LlmBackendConfig::ollama("http://localhost:11434/v1", "llama3");
        assert_eq!(config.provider.as_str(), "ollama");
        assert_eq!(config.model, "llama3");
    }
}
