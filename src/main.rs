//! liftpipe CLI
//!
//! Reads lift ticket records from stdin and drives the batching pipeline:
//! `liftpipe <BATCH_SIZE>`.

use clap::Parser;
use liftpipe::config::SnowflakeConfig;
use liftpipe::ingest::IngestClient;
use liftpipe::pipeline::Pipeline;
use liftpipe::source::TicketReader;
use liftpipe::stage::TableStage;
use liftpipe::Result;
use tracing::info;

/// Batching staged-ingestion pipeline for lift ticket purchase events
#[derive(Parser, Debug)]
#[command(name = "liftpipe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Records per batch
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    batch_size: u32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        // Configuration problems exit 2 so wrappers can tell them apart
        // from mid-run failures.
        std::process::exit(if e.is_fatal() { 2 } else { 1 });
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = SnowflakeConfig::from_env()?;
    let stage = TableStage::parse(&config.stage_url, &config.table)?;
    let ingest = IngestClient::new(&config)?;
    let pipeline = Pipeline::new(stage, ingest)?;

    let stdin = std::io::stdin();
    let reader = TicketReader::new(stdin.lock());
    let stats = pipeline.run(reader, cli.batch_size as usize).await?;
    info!(%stats, "ingestion complete");
    Ok(())
}
