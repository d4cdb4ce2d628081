//! Synthetic lift ticket feed
//!
//! Writes NDJSON records followed by the blank end-of-stream marker, ready
//! to pipe into `liftpipe`: `liftpipe-gen 1000 | liftpipe 100`.

use clap::Parser;
use liftpipe::source::{TicketGenerator, DEFAULT_RESORTS};
use std::io::Write;

/// Generate synthetic lift ticket purchase records as NDJSON
#[derive(Parser, Debug)]
#[command(name = "liftpipe-gen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of records to generate
    #[arg(default_value = "1")]
    count: u64,

    /// RNG seed for a reproducible feed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> std::io::Result<()> {
    let cli = Cli::parse();
    let mut generator = match cli.seed {
        Some(seed) => TicketGenerator::with_seed(DEFAULT_RESORTS, seed),
        None => TicketGenerator::new(DEFAULT_RESORTS),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for _ in 0..cli.count {
        let ticket = generator.generate();
        serde_json::to_writer(&mut out, &ticket)?;
        out.write_all(b"\n")?;
    }
    // Blank line marks end of stream for downstream readers.
    out.write_all(b"\n")?;
    Ok(())
}
