//! Natural-language request to workflow design.
//!
//! The pipeline runs these stages in order for each request:
//!
//! 1. [`IntentExtractor`]: request text to a [`WorkflowIntent`]
//! 2. [`SemanticRetriever`]: narrow the template library (semantic, then
//!    keyword, then raw prefix)
//! 3. [`NodeSelector`]: the model chooses, scores and sequences nodes
//! 4. [`DeduplicationFilter`]: drop true duplicates, fail open
//! 5. [`ConnectionSynthesizer`]: port-valid connections, falling back to a
//!    sequential chain
//!
//! [`explain`] renders any selection as text. [`WorkflowDesigner`] runs the
//! whole pipeline and assembles a [`WorkflowDesign`].

pub mod config;
pub mod connect;
pub mod dedupe;
pub mod design;
pub mod error;
pub mod explain;
pub mod intent;
mod lenient;
pub mod outcome;
pub mod pipeline;
pub mod retrieval;
pub mod selection;

pub use config::DesignerConfig;
pub use connect::{
    ConnectionEdge, ConnectionPlan, ConnectionSource, ConnectionSynthesizer, RejectedConnection,
    RejectionReason,
};
pub use dedupe::{DedupeOutcome, DedupeStatus, DeduplicationFilter};
pub use design::{DegradationReason, DesignMetadata, DesignedNode, Quality, WorkflowDesign};
pub use error::DesignError;
pub use explain::explain;
pub use intent::{IntentExtractor, WorkflowIntent};
pub use outcome::StageOutcome;
pub use pipeline::{DesignOutcome, WorkflowDesigner};
pub use retrieval::{Retrieval, RetrievalTier, SemanticRetriever};
pub use selection::{NodeSelector, RelevanceScore, Selection, SelectionMetadata};
