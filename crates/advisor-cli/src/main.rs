//! `advisor`: symptom diagnosis server and command-line tool.
//!
//! ```text
//! advisor serve --config advisor.yaml
//! advisor diagnose request.json
//! echo '{"symptoms":["fever"],"age":30,"gender":"male"}' | advisor diagnose --report
//! advisor prompt request.json
//! ```

mod config;
mod server;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use advisor_core::{PromptBuilder, SymptomRequest};
use advisor_runtime::{DiagnosisOrchestrator, ProviderRegistry};

use crate::config::AdvisorConfig;

#[derive(Parser)]
#[command(name = "advisor", version, about = "Symptom diagnosis with model-assisted and rule-based fallback")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Diagnose one request read from a JSON file or stdin
    Diagnose(DiagnoseArgs),

    /// Print the prompt that would be sent to the model
    Prompt {
        /// Request JSON file (stdin when omitted)
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Allowed CORS origin (repeatable, replaces the configured list)
    #[arg(long = "allow-origin")]
    allow_origins: Vec<String>,

    /// Skip the model and use heuristic diagnosis only
    #[arg(long)]
    no_model: bool,
}

#[derive(Args)]
struct DiagnoseArgs {
    /// Request JSON file (stdin when omitted)
    input: Option<PathBuf>,

    /// Skip the model and use heuristic diagnosis only
    #[arg(long)]
    no_model: bool,

    /// Include the result source and any degradation reason
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AdvisorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            if !args.allow_origins.is_empty() {
                config.server.allowed_origins = args.allow_origins;
            }
            if args.no_model {
                config.runtime.model.provider = None;
            }

            let orchestrator = build_orchestrator(&config).await?;
            server::serve(Arc::new(orchestrator), &config.server).await
        }
        Command::Diagnose(args) => {
            if args.no_model {
                config.runtime.model.provider = None;
            }

            let request = read_request(args.input.as_deref())?;
            let orchestrator = build_orchestrator(&config).await?;
            let report = orchestrator.diagnose_with_report(&request).await;

            let output = if args.report {
                json!({
                    "result": report.result,
                    "source": report.source,
                    "degraded_by": report.degraded_by.map(|e| e.to_string()),
                    "usage": report.usage.map(|u| json!({
                        "prompt_tokens": u.prompt_tokens,
                        "completion_tokens": u.completion_tokens,
                    })),
                    "diagnosed_at": report.diagnosed_at.to_rfc3339(),
                })
            } else {
                serde_json::to_value(&report.result)?
            };

            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Command::Prompt { input } => {
            let request = read_request(input.as_deref())?;
            println!("{}", PromptBuilder::new().build_for(&request));
            Ok(())
        }
    }
}

async fn build_orchestrator(config: &AdvisorConfig) -> Result<DiagnosisOrchestrator> {
    let registry = ProviderRegistry::with_defaults();
    config.validate_provider(&registry)?;

    let orchestrator = DiagnosisOrchestrator::from_config(config.runtime.clone(), &registry).await;

    if orchestrator.model_loaded() {
        tracing::info!("Model loaded");
    } else {
        tracing::info!("Model not loaded, falling back to heuristic responses");
    }

    Ok(orchestrator)
}

fn read_request(path: Option<&Path>) -> Result<SymptomRequest> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
    };

    serde_json::from_str(&content).context("Invalid symptom request JSON")
}
