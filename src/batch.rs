//! Batch accumulation
//!
//! Collects records into a fixed-capacity batch. A full batch is handed back
//! to the caller on the append that fills it; the accumulator resets to empty
//! in the same step, so no record can land in two batches.

use crate::error::{Error, Result};
use crate::ticket::LiftTicket;

/// Fixed-capacity, order-preserving record accumulator
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    buf: Vec<LiftTicket>,
}

impl BatchAccumulator {
    /// Create an accumulator with the given capacity.
    ///
    /// Capacity zero is a configuration error.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidBatchSize {
                value: capacity.to_string(),
            });
        }
        Ok(Self {
            capacity,
            buf: Vec::with_capacity(capacity),
        })
    }

    /// Append one record; returns the completed batch when the append fills it
    pub fn push(&mut self, ticket: LiftTicket) -> Option<Vec<LiftTicket>> {
        self.buf.push(ticket);
        if self.buf.len() == self.capacity {
            Some(std::mem::replace(
                &mut self.buf,
                Vec::with_capacity(self.capacity),
            ))
        } else {
            None
        }
    }

    /// Drain the final partial batch, if any
    pub fn flush(&mut self) -> Option<Vec<LiftTicket>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }

    /// Number of records currently buffered
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no records are buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Configured batch capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
