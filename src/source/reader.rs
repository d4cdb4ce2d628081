//! NDJSON ticket reader
//!
//! One record per line; a blank line or EOF terminates the stream. Each
//! malformed line yields an error carrying its line number so the caller can
//! report and skip it without losing the rest of the stream.

use crate::error::{Error, Result};
use crate::ticket::LiftTicket;
use std::io::BufRead;

/// Iterator of `Result<LiftTicket>` over newline-delimited JSON
pub struct TicketReader<R> {
    reader: R,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> TicketReader<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for TicketReader<R> {
    type Item = Result<LiftTicket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line_no += 1;
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.is_empty() {
                    // Blank line is the end-of-stream marker.
                    self.done = true;
                    return None;
                }
                match serde_json::from_str::<LiftTicket>(trimmed) {
                    Ok(ticket) => Some(Ok(ticket)),
                    Err(e) => Some(Err(Error::record(self.line_no, e.to_string()))),
                }
            }
            Err(e) => {
                self.done = true;
                Some(Err(Error::from(e)))
            }
        }
    }
}
