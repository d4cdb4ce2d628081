//! Record source
//!
//! Two producers of lift ticket records: an NDJSON reader over any `BufRead`
//! (the pipeline's input) and a seedable synthetic generator behind the
//! `liftpipe-gen` binary.

mod generator;
mod reader;

pub use generator::{season_end, TicketGenerator, DEFAULT_RESORTS};
pub use reader::TicketReader;
