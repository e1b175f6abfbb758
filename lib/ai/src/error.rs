//! Collaborator failures.
//!
//! Every one of these is recoverable from the pipeline's point of view: the
//! calling stage logs it and takes its fallback path.

use std::fmt;

/// A generative model call that produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The provider could not be reached at all.
    ProviderUnavailable { provider: String, reason: String },
    /// Non-success status, or the body could not be read.
    RequestFailed { reason: String },
    ResponseParseFailed { reason: String },
    /// The per-call deadline expired.
    Timeout,
    RateLimited { retry_after_secs: Option<u64> },
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// A query embedding that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    RequestFailed { reason: String },
    /// The service answered with something that is not an embedding.
    ResponseParseFailed { reason: String },
    Timeout,
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "embedding request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse embedding response: {reason}")
            }
            Self::Timeout => write!(f, "embedding request timed out"),
        }
    }
}

impl std::error::Error for EmbeddingError {}

/// Errors from recovering JSON out of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The model returned nothing but whitespace.
    Empty,
    /// No JSON of the expected shape could be found.
    NoJson { expected: &'static str, excerpt: String },
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "model response was empty"),
            Self::NoJson { expected, excerpt } => {
                write!(f, "no JSON {expected} found in model response: {excerpt}")
            }
        }
    }
}

impl std::error::Error for ResponseError {}
