//! # liftpipe
//!
//! Batching staged-ingestion pipeline for lift ticket purchase events.
//!
//! Reads newline-delimited JSON records from an input stream, accumulates
//! them into fixed-capacity batches, serializes each batch to a Snappy
//! Parquet file (dictionary encoding disabled), uploads the file to the
//! destination table's stage, and notifies a Snowpipe-style pipe that the
//! file is ready for asynchronous loading.
//!
//! ```text
//! stdin (NDJSON) → BatchAccumulator → Parquet writer → TableStage (@%TABLE)
//!                                                         → IngestClient (pipe)
//! ```
//!
//! Each batch is one atomic serialize → upload → notify invocation, issued
//! sequentially in stream order. Per-batch failures are caught at the batch
//! boundary; configuration failures abort before anything is touched; the
//! scoped temp directory is released on every exit path.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

/// Error types for the pipeline
pub mod error;

/// Lift ticket record types
pub mod ticket;

/// Environment-sourced configuration
pub mod config;

/// NDJSON reader and synthetic generator
pub mod source;

/// Fixed-capacity batch accumulation
pub mod batch;

/// Arrow conversion and Parquet writing
pub mod output;

/// Table stage uploads over object storage
pub mod stage;

/// Snowpipe ingest notification
pub mod ingest;

/// Run lifecycle: resources, per-batch pipeline, cleanup
pub mod pipeline;

pub use error::{Error, Result};
pub use ticket::{Address, EmergencyContact, LiftTicket};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
