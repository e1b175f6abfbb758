//! HTTP implementations of the model and embedding backends.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, ModelOutput, TokenUsage,
};
use crate::embedding::{EmbeddingBackend, EmbeddingBackendConfig};
use crate::error::{EmbeddingError, LlmError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Chat-completions backend for OpenAI and compatible servers (Ollama's `/v1`,
/// vLLM, llama.cpp server, ...).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: Client,
    config: LlmBackendConfig,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] when the provider requires an API
    /// key and none is configured.
    pub fn new(config: LlmBackendConfig) -> Result<Self, LlmError> {
        if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
            return Err(LlmError::InvalidConfig {
                reason: "the openai provider requires an api_key".to_string(),
            });
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature.or(self.config.temperature),
            max_tokens: self.config.max_tokens,
        };

        let builder = with_bearer(
            self.client.post(self.endpoint()).json(&body),
            self.config.api_key.as_deref(),
        );
        let response = send_llm(builder, self.config.provider).await?;

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "response contained no message content".to_string(),
            })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Backend for a plain prompt endpoint.
///
/// POSTs `{model, prompt, system, temperature}` to the base URL and accepts
/// either a JSON string, a `{content}` object, or raw text as the answer.
#[derive(Debug, Clone)]
pub struct PromptEndpointBackend {
    client: Client,
    config: LlmBackendConfig,
}

impl PromptEndpointBackend {
    /// Creates a backend from configuration.
    #[must_use]
    pub fn new(config: LlmBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct PromptEndpointRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[async_trait]
impl LlmBackend for PromptEndpointBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = PromptEndpointRequest {
            model: &self.config.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            temperature: request.temperature.or(self.config.temperature),
        };

        let builder = with_bearer(
            self.client.post(&self.config.base_url).json(&body),
            self.config.api_key.as_deref(),
        );
        let response = send_llm(builder, self.config.provider).await?;

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseParseFailed {
                reason: e.to_string(),
            })?;

        let output = serde_json::from_str::<ModelOutput>(&text).unwrap_or(ModelOutput::Text(text));
        Ok(LlmResponse::from_output(output, self.config.model.clone()))
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::PromptEndpoint
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Embedding backend for the OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingBackend {
    client: Client,
    config: EmbeddingBackendConfig,
}

impl OpenAiEmbeddingBackend {
    /// Creates a backend from configuration.
    #[must_use]
    pub fn new(config: EmbeddingBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddingBackend {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let builder = with_bearer(
            self.client.post(url).json(&EmbeddingRequest {
                model: &self.config.model,
                input: text,
            }),
            self.config.api_key.as_deref(),
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else {
                EmbeddingError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::RequestFailed {
                reason: format!("embedding service answered {status}"),
            });
        }

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EmbeddingError::ResponseParseFailed {
                reason: "response contained no embedding".to_string(),
            })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn with_bearer(builder: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

async fn send_llm(builder: RequestBuilder, provider: LlmProvider) -> Result<Response, LlmError> {
    let response = builder.send().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_connect() {
            LlmError::ProviderUnavailable {
                provider: provider.as_str().to_string(),
                reason: e.to_string(),
            }
        } else {
            LlmError::RequestFailed {
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(LlmError::RateLimited { retry_after_secs });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::RequestFailed {
            reason: format!("{status}: {}", body.chars().take(200).collect::<String>()),
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_requires_api_key() {
        let mut config = LlmBackendConfig::openai("sk-test", "gpt-4o-mini");
        config.api_key = None;
        let err = OpenAiCompatibleBackend::new(config).unwrap_err();
        assert!(matches!(err, LlmError::InvalidConfig { .. }));
    }

    #[test]
    fn compatible_backend_builds_endpoint() {
        let config = LlmBackendConfig::ollama("http://localhost:11434/v1/", "llama3");
        let backend = OpenAiCompatibleBackend::new(config).expect("no key needed");
        assert_eq!(backend.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(backend.model(), "llama3");
    }

    #[test]
    fn chat_request_omits_unset_sampling() {
        let body = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: None,
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_response_tolerates_missing_usage() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "[]"}}]}"#,
        )
        .expect("deserialize");
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
    }
}
