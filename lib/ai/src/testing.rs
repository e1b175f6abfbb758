//! Scripted in-memory backends for tests.
//!
//! Enabled with the `testing` feature.

use crate::backend::{LlmBackend, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
use crate::embedding::EmbeddingBackend;
use crate::error::{EmbeddingError, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An LLM backend that replays queued answers in order and records every
/// prompt it receives.
///
/// When the queue runs dry it fails with [`LlmError::RequestFailed`].
#[derive(Debug, Default)]
pub struct ScriptedLlmBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmBackend {
    /// Creates a backend with no queued answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful answer.
    #[must_use]
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Prompts received so far, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, reply: Result<String, LlmError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlmBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());

        match next {
            Some(Ok(content)) => Ok(LlmResponse {
                content,
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
            }),
            Some(Err(error)) => Err(error),
            None => Err(LlmError::RequestFailed {
                reason: "no scripted reply left".to_string(),
            }),
        }
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::OpenAiCompatible
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// An embedding backend that answers every query with the same vector.
#[derive(Debug)]
pub struct FixedEmbeddingBackend {
    vector: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl FixedEmbeddingBackend {
    /// Answers every query with `vector`.
    #[must_use]
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every query.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            vector: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of queries embedded so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingBackend for FixedEmbeddingBackend {
    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vector
            .clone()
            .ok_or_else(|| EmbeddingError::RequestFailed {
                reason: "embedding service offline".to_string(),
            })
    }

    fn model(&self) -> &str {
        "fixed"
    }
}
