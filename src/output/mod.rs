//! Columnar output
//!
//! Converts ticket batches to Arrow RecordBatches with the fixed 11-column
//! schema and writes them to Parquet files (Snappy, dictionary encoding
//! disabled) ready for staging.

mod schema;
mod writer;

pub use schema::{arrow_to_tickets, ticket_schema, tickets_to_arrow};
pub use writer::{write_tickets_to_parquet, ParquetWriter, ParquetWriterConfig};
