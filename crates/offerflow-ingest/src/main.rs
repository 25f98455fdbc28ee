//! Offerflow Ingest - bet offer pipeline runner

use anyhow::{Context, Result};
use clap::Parser;
use offerflow_common::logging::{init_logging, LogConfig, LogLevel};
use offerflow_common::types::Offer;
use offerflow_ingest::{
    MemoryQueue, Pipeline, PipelineConfig, PipelineOutput, RegistryClient, SqsConfig, SqsTransport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const REPLAY_SOURCE: &str = "memory://replay-source";
const REPLAY_DESTINATION: &str = "memory://replay-destination";

#[derive(Parser, Debug)]
#[command(name = "offerflow-ingest")]
#[command(author, version, about = "Bet offer ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Drain the source queue, enrich and publish to the destination queue
    Run {
        /// Write the published offers as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Feed offers from a JSON file through an in-memory queue
    Replay {
        /// JSON array of offers
        #[arg(short, long)]
        input: PathBuf,

        /// Write the published offers as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("offerflow-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = PipelineConfig::from_env().context("Failed to load pipeline configuration")?;

    let (output, path) = match cli.command {
        Command::Run { output } => (run(&config).await?, output),
        Command::Replay { input, output } => (replay(config, &input).await?, output),
    };

    info!(
        published = output.offers.len(),
        acknowledged = output.stats.acknowledged,
        failures = output.failures.len(),
        elapsed_ms = output.stats.elapsed_ms,
        "Run summary"
    );

    if let Some(path) = path {
        write_offers(&path, &output)?;
    }

    Ok(())
}

async fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    info!(source = %config.source_queue_url, destination = %config.destination_queue_url, "Starting pipeline run");

    let sqs_config = SqsConfig::from_env().context("Failed to load SQS configuration")?;
    let transport = Arc::new(SqsTransport::new(sqs_config).await);
    let registry = Arc::new(RegistryClient::from_config(config)?);

    Ok(Pipeline::new(config, transport, registry)?.run().await?)
}

async fn replay(config: PipelineConfig, input: &Path) -> Result<PipelineOutput> {
    let raw = std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let offers: Vec<Offer> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of offers", input.display()))?;
    info!(input = %input.display(), offers = offers.len(), "Replaying offers");

    let queue = Arc::new(MemoryQueue::new());
    queue.create_queue(REPLAY_DESTINATION).await;
    queue.push_json(REPLAY_SOURCE, &offers).await?;

    let config = PipelineConfig {
        source_queue_url: REPLAY_SOURCE.to_string(),
        destination_queue_url: REPLAY_DESTINATION.to_string(),
        ..config
    };
    let registry = Arc::new(RegistryClient::from_config(&config)?);

    Ok(Pipeline::new(&config, queue, registry)?.run().await?)
}

fn write_offers(path: &Path, output: &PipelineOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(&output.offers)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote published offers");
    Ok(())
}
