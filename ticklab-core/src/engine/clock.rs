//! Clock — the simulation time cursor.
//!
//! Ticks are strictly increasing and gapless at the declared resolution:
//! weekends and holidays still tick. Skipping non-sessions is the calendar
//! collaborator's job (time rules simply never match there), not the
//! clock's.

use crate::domain::{Instant, SimulationRange};
use thiserror::Error;

/// End-of-range signal. Expected at every clean run end, not a fault.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("simulation range exhausted")]
pub struct RangeExhausted;

pub struct Clock {
    range: SimulationRange,
    /// Instant the next `advance()` will return.
    next: Instant,
}

impl Clock {
    pub fn new(range: SimulationRange) -> Self {
        Self {
            range,
            next: range.first_instant(),
        }
    }

    pub fn range(&self) -> &SimulationRange {
        &self.range
    }

    /// Return the next instant, or `RangeExhausted` once past the end date.
    /// Callers must stop advancing after the error.
    pub fn advance(&mut self) -> Result<Instant, RangeExhausted> {
        if self.next >= self.range.end_bound() {
            return Err(RangeExhausted);
        }
        let instant = self.next;
        self.next += self.range.resolution().step();
        Ok(instant)
    }
}
