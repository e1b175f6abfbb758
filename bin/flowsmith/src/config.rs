//! Command line configuration.
//!
//! Loaded via the `config` crate from an optional file, then environment
//! variables prefixed with `FLOWSMITH` (`FLOWSMITH__LLM__MODEL`,
//! `FLOWSMITH__DESIGNER__MAX_NODES`, ...).

use flowsmith_ai::{EmbeddingBackendConfig, LlmBackendConfig};
use flowsmith_designer::DesignerConfig;
use flowsmith_knowledge::SnapshotConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct FlowsmithConfig {
    /// Generative model backend.
    pub llm: LlmBackendConfig,

    /// Query embedding backend.
    pub embedding: EmbeddingBackendConfig,

    /// Where the knowledge graph snapshot comes from.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Pipeline tuning.
    #[serde(default)]
    pub designer: DesignerConfig,

    /// Upper bound on one whole design run, in seconds.
    #[serde(default = "default_pipeline_timeout_secs")]
    pub pipeline_timeout_secs: u64,
}

fn default_pipeline_timeout_secs() -> u64 {
    300
}

impl FlowsmithConfig {
    /// Loads configuration from `file` (when given) and the environment.
    /// Environment values win.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if required
    /// configuration is missing or invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("FLOWSMITH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }
}
