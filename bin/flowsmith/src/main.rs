//! `flowsmith design "<request>"`: turns a request into a workflow design.

mod config;

use clap::{Parser, Subcommand};
use crate::config::FlowsmithConfig;
use flowsmith_ai::{
    EmbeddingBackend, LlmBackend, LlmBackendConfig, LlmProvider, OpenAiCompatibleBackend,
    OpenAiEmbeddingBackend, PromptEndpointBackend,
};
use flowsmith_designer::{DesignOutcome, WorkflowDesigner};
use flowsmith_knowledge::KnowledgeGraphStore;
use rootcause::Report;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "flowsmith", version, about = "Design workflows from plain-language requests")]
struct Cli {
    /// Configuration file (TOML). Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Design a workflow and print it as JSON.
    Design {
        /// What the workflow should do.
        request: String,

        /// Print the selection explanation instead of the design.
        #[arg(long)]
        explain: bool,

        /// Knowledge graph snapshot file, overriding the configured source.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Debug)]
enum CliError {
    Config { reason: String },
    Backend { reason: String },
    PipelineTimeout { secs: u64 },
    Output { reason: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Backend { reason } => write!(f, "cannot create model backend: {reason}"),
            Self::PipelineTimeout { secs } => write!(f, "design did not finish within {secs}s"),
            Self::Output { reason } => write!(f, "cannot render output: {reason}"),
        }
    }
}

impl std::error::Error for CliError {}

#[tokio::main]
async fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!(error = %report, "flowsmith failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Report<CliError>> {
    let mut config = FlowsmithConfig::load(cli.config.as_deref()).map_err(|e| CliError::Config {
        reason: e.to_string(),
    })?;
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        "Loaded configuration"
    );

    match cli.command {
        Command::Design {
            request,
            explain,
            snapshot,
        } => {
            if let Some(path) = snapshot {
                config.snapshot.path = Some(path);
            }
            let designer = build_designer(&config)?;

            let timeout = config.pipeline_timeout();
            let outcome = tokio::time::timeout(timeout, designer.design(&request))
                .await
                .map_err(|_| CliError::PipelineTimeout {
                    secs: config.pipeline_timeout_secs,
                })?;

            println!("{}", render(&outcome, explain)?);
            Ok(())
        }
    }
}

fn build_designer(config: &FlowsmithConfig) -> Result<WorkflowDesigner, Report<CliError>> {
    let llm = llm_backend(config.llm.clone())?;
    let embeddings: Arc<dyn EmbeddingBackend> =
        Arc::new(OpenAiEmbeddingBackend::new(config.embedding.clone()));
    let store = Arc::new(KnowledgeGraphStore::from_config(&config.snapshot));

    Ok(WorkflowDesigner::new(store, llm, embeddings, &config.designer))
}

fn llm_backend(config: LlmBackendConfig) -> Result<Arc<dyn LlmBackend>, Report<CliError>> {
    match config.provider {
        LlmProvider::PromptEndpoint => Ok(Arc::new(PromptEndpointBackend::new(config))),
        LlmProvider::OpenAi | LlmProvider::OpenAiCompatible | LlmProvider::Ollama => {
            let backend = OpenAiCompatibleBackend::new(config).map_err(|e| CliError::Backend {
                reason: e.to_string(),
            })?;
            Ok(Arc::new(backend))
        }
    }
}

fn render(outcome: &DesignOutcome, explain: bool) -> Result<String, Report<CliError>> {
    if explain {
        return Ok(match outcome {
            DesignOutcome::Designed(design) => design.metadata.explanation.clone(),
            DesignOutcome::NoRelevantNodes { reason } => format!("no relevant nodes: {reason}"),
        });
    }
    serde_json::to_string_pretty(outcome).map_err(|e| {
        CliError::Output {
            reason: e.to_string(),
        }
        .into()
    })
}
