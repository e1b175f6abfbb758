//! LLM Call primitive.
//!
//! The fundamental AI operation: single-shot inference. Every pipeline stage
//! that consults the generative model builds an `LlmCall` and invokes it
//! against a backend; the call adds latency bookkeeping, logging and an
//! optional deadline.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use ulid::Ulid;

/// Unique identifier for an LLM invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LlmInvocationId(Ulid);

impl LlmInvocationId {
    /// Creates a new invocation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for LlmInvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LlmInvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "llm_{}", self.0)
    }
}

/// The result of an LLM Call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: LlmInvocationId,
    /// The raw text output.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

impl LlmCallResult {
    /// Creates a result from an LLM response.
    #[must_use]
    pub fn from_response(id: LlmInvocationId, response: LlmResponse, latency_ms: u64) -> Self {
        Self {
            id,
            content: response.content,
            usage: response.usage,
            model: response.model,
            timestamp: Utc::now(),
            latency_ms,
        }
    }
}

/// An LLM Call executor.
#[derive(Debug, Clone)]
pub struct LlmCall {
    /// Short label naming the pipeline step, used in logs.
    purpose: &'static str,
    prompt: String,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl LlmCall {
    /// Creates a new LLM Call with the given prompt.
    #[must_use]
    pub fn new(purpose: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            purpose,
            prompt: prompt.into(),
            system_prompt: None,
            temperature: None,
            timeout: None,
        }
    }

    /// Adds a system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Bounds how long the backend may take to answer.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds an LLM request from this configuration.
    #[must_use]
    pub fn build_request(&self) -> LlmRequest {
        let mut request = LlmRequest::new(self.prompt.clone());

        if let Some(ref system) = self.system_prompt {
            request = request.with_system(system.clone());
        }

        if let Some(temp) = self.temperature {
            request = request.with_temperature(temp);
        }

        request
    }

    /// Sends the call to a backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or [`LlmError::Timeout`] when the
    /// configured deadline expires first.
    pub async fn invoke(&self, backend: &dyn LlmBackend) -> flowsmith_core::Result<LlmCallResult, LlmError> {
        let id = LlmInvocationId::new();
        let request = self.build_request();
        let started = Instant::now();

        tracing::debug!(
            invocation = %id,
            purpose = self.purpose,
            provider = backend.provider().as_str(),
            model = backend.model(),
            prompt_chars = request.prompt.len(),
            "invoking model"
        );

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, backend.generate(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(LlmError::Timeout),
            },
            None => backend.generate(&request).await,
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(response) => {
                tracing::debug!(
                    invocation = %id,
                    purpose = self.purpose,
                    latency_ms,
                    response_chars = response.content.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "model answered"
                );
                Ok(LlmCallResult::from_response(id, response, latency_ms))
            }
            Err(error) => {
                tracing::warn!(
                    invocation = %id,
                    purpose = self.purpose,
                    latency_ms,
                    error = %error,
                    "model invocation failed"
                );
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmProvider;
    use async_trait::async_trait;

    struct SlowBackend;

    #[async_trait]
    impl LlmBackend for SlowBackend {
        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(LlmResponse {
                content: "late".to_string(),
                usage: TokenUsage::default(),
                model: "slow".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "slow"
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: request.prompt.clone(),
                usage: TokenUsage::default(),
                model: "echo".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn llm_call_builder() {
        let call = LlmCall::new("select", "Choose nodes")
            .with_system_prompt("You are a workflow designer.")
            .with_temperature(Some(0.3));

        let request = call.build_request();
        assert_eq!(request.prompt, "Choose nodes");
        assert_eq!(
            request.system,
            Some("You are a workflow designer.".to_string())
        );
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn invocation_id_display() {
        let id = LlmInvocationId::new();
        assert!(id.to_string().starts_with("llm_"));
    }

    #[tokio::test]
    async fn invoke_returns_backend_content() {
        let result = LlmCall::new("echo", "ping")
            .invoke(&EchoBackend)
            .await
            .expect("echo succeeds");

        assert_eq!(result.content, "ping");
        assert_eq!(result.model, "echo");
    }

    #[tokio::test(start_paused = true)]
    async fn invoke_times_out() {
        let result = LlmCall::new("slow", "ping")
            .with_timeout(Some(Duration::from_millis(50)))
            .invoke(&SlowBackend)
            .await;

        let err = result.expect_err("deadline should expire");
        assert!(err.to_string().contains("timed out"));
    }
}
