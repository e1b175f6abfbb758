//! Generative model and embedding collaborators for flowsmith.
//!
//! This crate provides the narrow interfaces the workflow designer consumes:
//!
//! - **LLM Call**: Single-shot inference against an [`LlmBackend`]
//! - **Embeddings**: Query embedding and cosine similarity via [`EmbeddingBackend`]
//! - **Response recovery**: Pulling JSON out of free-form model output
//!
//! HTTP implementations for OpenAI-compatible services live in [`http`].

pub mod backend;
pub mod embedding;
pub mod error;
pub mod http;
pub mod llm_call;
pub mod response;
#[cfg(feature = "testing")]
pub mod testing;

pub use backend::{LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, ModelOutput};
pub use embedding::{EmbeddingBackend, EmbeddingBackendConfig, cosine_similarity};
pub use error::{EmbeddingError, LlmError, ResponseError};
pub use http::{OpenAiCompatibleBackend, OpenAiEmbeddingBackend, PromptEndpointBackend};
pub use llm_call::{LlmCall, LlmCallResult, LlmInvocationId};
