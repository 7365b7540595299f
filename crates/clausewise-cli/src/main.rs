mod analyze;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clausewise_ai::vertex::{DEFAULT_LOCATION, DEFAULT_MODEL};
use clausewise_ai::{GenerationParams, ModelInvoker, RetryPolicy, VertexClient, VertexConfig};
use clausewise_core::DEFAULT_CHUNK_SIZE;
use clausewise_store::{OutputArtifact, PlainTextSource, TextSource};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analyze::{AnalysisSettings, Analyzer};

/// Extract risk-rated clauses from a legal document.
#[derive(Parser, Debug)]
#[command(name = "clausewise", version, about)]
struct Cli {
    /// Path to the document
    #[arg(long)]
    file: PathBuf,

    /// Jurisdiction the analysis applies to
    #[arg(long, default_value = "India")]
    jurisdiction: String,

    /// Whose interests to analyze for (e.g. client, vendor, lawyer)
    #[arg(long, default_value = "client")]
    role: String,

    /// Newline-delimited JSON output file, truncated at the start of each run
    #[arg(long, env = "CLAUSEWISE_OUTPUT", default_value = "output.jsonl")]
    output: PathBuf,

    /// Maximum characters per chunk sent to the model
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Google Cloud project hosting the model
    #[arg(long, env = "CLAUSEWISE_PROJECT")]
    project: String,

    #[arg(long, env = "CLAUSEWISE_LOCATION", default_value = DEFAULT_LOCATION)]
    location: String,

    #[arg(long, env = "CLAUSEWISE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Override the regional Vertex AI endpoint
    #[arg(long, env = "CLAUSEWISE_ENDPOINT")]
    endpoint: Option<String>,

    /// OAuth access token (e.g. from `gcloud auth print-access-token`)
    #[arg(long, env = "CLAUSEWISE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    #[arg(long, default_value_t = 4000)]
    max_output_tokens: u32,

    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Seconds allowed for one model request, streamed response included
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("clausewise v{}", env!("CARGO_PKG_VERSION"));

    let artifact = OutputArtifact::create(&cli.output)
        .await
        .with_context(|| format!("creating {}", cli.output.display()))?;

    let text = match PlainTextSource.extract_text(&cli.file).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %cli.file.display(), error = %e, "text extraction failed");
            String::new()
        }
    };

    let client = VertexClient::new(VertexConfig {
        location: cli.location,
        model: cli.model,
        endpoint: cli.endpoint,
        request_timeout: Duration::from_secs(cli.request_timeout),
        ..VertexConfig::new(cli.project, cli.access_token)
    })
    .context("building model client")?;
    let params = GenerationParams {
        max_output_tokens: cli.max_output_tokens,
        temperature: cli.temperature,
    };
    let invoker = ModelInvoker::with_settings(client, params, RetryPolicy::default());
    let analyzer = Analyzer::new(
        invoker,
        AnalysisSettings {
            role: cli.role,
            jurisdiction: cli.jurisdiction,
            chunk_size: cli.chunk_size,
            ..AnalysisSettings::default()
        },
    );

    let outcome = analyzer.analyze_text(&text).await;
    let written = artifact
        .write_records(&outcome.persisted_records())
        .await
        .context("writing output artifact")?;

    eprintln!(
        "  {} clauses ({} first pass{}), {} errors; {} lines written to {}",
        outcome.clauses.len(),
        outcome.first_pass_clauses,
        if outcome.refined { ", refined" } else { "" },
        outcome.errors.len(),
        written,
        artifact.path().display()
    );
    Ok(())
}
