//! Error types for the design pipeline.
//!
//! Lower layers report `LlmError`, `EmbeddingError`, `ResponseError` and
//! `SnapshotError`; stages re-contextualize those as a `DesignError`
//! describing which part of the design could not be produced.

use std::fmt;

/// Why a stage could not produce its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignError {
    /// No snapshot source produced a knowledge graph.
    SnapshotUnavailable,
    /// The generative model could not be reached or answered with an error.
    ModelInvocation { stage: &'static str },
    /// The model answered, but nothing usable could be parsed from it.
    MalformedModelResponse { stage: &'static str, reason: String },
    /// There were no candidates to select from.
    EmptyCandidateSet,
    /// The model named nodes, but none survived validation.
    NoValidSelection { dropped: usize },
    /// The model proposed connections, but none survived validation.
    NoValidConnections { rejected: usize },
}

impl fmt::Display for DesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SnapshotUnavailable => write!(f, "knowledge graph snapshot unavailable"),
            Self::ModelInvocation { stage } => {
                write!(f, "model invocation failed during {stage}")
            }
            Self::MalformedModelResponse { stage, reason } => {
                write!(f, "malformed model response during {stage}: {reason}")
            }
            Self::EmptyCandidateSet => write!(f, "no candidate nodes available"),
            Self::NoValidSelection { dropped } => {
                write!(f, "no valid nodes selected ({dropped} entries dropped)")
            }
            Self::NoValidConnections { rejected } => {
                write!(f, "no valid connections ({rejected} proposals rejected)")
            }
        }
    }
}

impl std::error::Error for DesignError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_error_display() {
        assert_eq!(
            DesignError::ModelInvocation { stage: "selection" }.to_string(),
            "model invocation failed during selection"
        );
        assert_eq!(
            DesignError::NoValidConnections { rejected: 3 }.to_string(),
            "no valid connections (3 proposals rejected)"
        );
        assert_eq!(
            DesignError::EmptyCandidateSet.to_string(),
            "no candidate nodes available"
        );
    }
}
