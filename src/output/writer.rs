//! Parquet file writer
//!
//! Writes ticket RecordBatches to Parquet. Defaults match what the staging
//! pipeline ships: Snappy compression with dictionary encoding disabled.

use crate::error::{Error, Result};
use crate::output::tickets_to_arrow;
use crate::ticket::LiftTicket;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Configuration for the Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    dictionary_enabled: bool,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            dictionary_enabled: false,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a config with the pipeline defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression codec
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Set the maximum row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_dictionary_enabled(self.dictionary_enabled)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer over an open file handle
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a writer for the given path and schema
    pub fn new(
        path: impl AsRef<Path>,
        schema: &Schema,
        config: &ParquetWriterConfig,
    ) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        let writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(config.build_properties()))?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write one RecordBatch
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch)?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Close the writer, finalizing the file; returns rows written
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close()?;
        Ok(rows)
    }
}

/// Serialize one ticket batch to a Parquet file at `path`.
///
/// Returns the number of rows written. An empty batch is a serialization
/// error; the accumulator never emits one.
pub fn write_tickets_to_parquet(
    path: impl AsRef<Path>,
    tickets: &[LiftTicket],
    config: &ParquetWriterConfig,
) -> Result<usize> {
    if tickets.is_empty() {
        return Err(Error::serialization("refusing to write an empty batch"));
    }
    let batch = tickets_to_arrow(tickets)?;
    let mut writer = ParquetWriter::new(path, batch.schema().as_ref(), config)?;
    writer.write(&batch)?;
    writer.close()
}
