//! Pipeline lifecycle
//!
//! Owns the run-scoped resources (temp directory, stage handle, ingest
//! client) and drives each batch through serialize → upload → notify. The
//! run moves Idle → Connected → Streaming → Draining → Closed; per-batch
//! failures are caught at the batch boundary and never stop later batches,
//! and the temp directory is released on every exit path.

use crate::batch::BatchAccumulator;
use crate::error::{Error, Result};
use crate::ingest::IngestClient;
use crate::output::{write_tickets_to_parquet, ParquetWriterConfig};
use crate::stage::TableStage;
use crate::ticket::LiftTicket;
use std::fmt;
use std::path::Path;
use tempfile::TempDir;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome accounting for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Records read from the input stream
    pub records: usize,
    /// Malformed input lines skipped
    pub skipped: usize,
    /// Batches staged and notified
    pub committed: usize,
    /// Batches that failed at some pipeline step
    pub failed: usize,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records in {} batches ({} failed, {} malformed lines skipped)",
            self.records, self.committed, self.failed, self.skipped
        )
    }
}

/// The batching-and-staged-ingestion pipeline for one run
pub struct Pipeline {
    stage: TableStage,
    ingest: IngestClient,
    temp_dir: TempDir,
    writer_config: ParquetWriterConfig,
}

impl Pipeline {
    /// Acquire run-scoped resources: a fresh temp directory plus the stage
    /// and ingest handles reused across all batches.
    pub fn new(stage: TableStage, ingest: IngestClient) -> Result<Self> {
        Ok(Self {
            stage,
            ingest,
            temp_dir: TempDir::new()?,
            writer_config: ParquetWriterConfig::default(),
        })
    }

    /// The scoped temp directory holding in-flight batch files
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Consume the record stream, committing one batch per `batch_size`
    /// records and flushing the final partial batch at end of stream.
    ///
    /// The temp directory is removed before returning, however many batches
    /// failed; an unwind mid-run releases it through `TempDir`'s drop.
    pub async fn run<I>(self, records: I, batch_size: usize) -> Result<RunStats>
    where
        I: IntoIterator<Item = Result<LiftTicket>>,
    {
        let mut accumulator = BatchAccumulator::new(batch_size)?;
        let mut stats = RunStats::default();
        info!(
            batch_size,
            stage = %self.stage.stage_name(),
            pipe = %self.ingest.pipe(),
            "connected; streaming records"
        );

        for record in records {
            match record {
                Ok(ticket) => {
                    stats.records += 1;
                    if let Some(batch) = accumulator.push(ticket) {
                        self.handle_batch(batch, &mut stats).await;
                    }
                }
                Err(e @ Error::Record { .. }) => {
                    warn!("skipping malformed input line: {e}");
                    stats.skipped += 1;
                }
                Err(e) => {
                    // Input stream broke mid-run; drain what we have and
                    // still release resources.
                    error!("input stream failed, draining: {e}");
                    break;
                }
            }
        }

        if let Some(batch) = accumulator.flush() {
            self.handle_batch(batch, &mut stats).await;
        }

        self.temp_dir.close()?;
        info!(%stats, "run closed");
        Ok(stats)
    }

    async fn handle_batch(&self, batch: Vec<LiftTicket>, stats: &mut RunStats) {
        let index = stats.committed + stats.failed;
        let size = batch.len();
        match self.commit_batch(index, &batch).await {
            Ok(()) => stats.committed += 1,
            Err(e) => {
                error!(batch = index, size, "batch failed: {e}");
                stats.failed += 1;
            }
        }
    }

    /// One atomic pipeline invocation: serialize the batch to a uniquely
    /// named Parquet file, stage it, then notify the pipe.
    ///
    /// A failed upload leaves the local file in place and issues no
    /// ingestion request. A non-success acknowledgment is reported but is
    /// not a batch failure; the file stays staged for out-of-band
    /// reconciliation.
    pub async fn commit_batch(&self, index: usize, batch: &[LiftTicket]) -> Result<()> {
        let file_name = format!("{}.parquet", Uuid::new_v4());
        let local = self.temp_dir.path().join(&file_name);

        let rows = write_tickets_to_parquet(&local, batch, &self.writer_config)?;
        info!(batch = index, rows, file = %file_name, "batch serialized");

        self.stage.upload(&local, &file_name).await?;
        info!(batch = index, file = %file_name, stage = %self.stage.stage_name(), "file staged");

        let response = self.ingest.insert_file(&file_name).await?;
        if response.is_success() {
            info!(batch = index, file = %file_name, code = %response.response_code, "ingest queued");
        } else {
            warn!(
                batch = index,
                file = %file_name,
                code = %response.response_code,
                "ingest service did not accept the file; it remains staged"
            );
        }
        Ok(())
    }
}
