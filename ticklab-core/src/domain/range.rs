//! Simulation range — the bounded date axis a run walks over.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point on the simulation timeline.
pub type Instant = NaiveDateTime;

/// Granularity at which the clock advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Daily,
    Hourly,
    Minute,
    Second,
}

impl Resolution {
    /// Duration of one tick at this resolution.
    pub fn step(&self) -> Duration {
        match self {
            Resolution::Daily => Duration::days(1),
            Resolution::Hourly => Duration::hours(1),
            Resolution::Minute => Duration::minutes(1),
            Resolution::Second => Duration::seconds(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
}

/// Validated date range plus resolution. Immutable once a run starts —
/// the clock takes it by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRange {
    start: NaiveDate,
    end: NaiveDate,
    resolution: Resolution,
}

impl SimulationRange {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::StartAfterEnd { start, end });
        }
        Ok(Self {
            start,
            end,
            resolution,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// First instant of the range (start date at midnight).
    pub fn first_instant(&self) -> Instant {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Exclusive upper bound: midnight after the end date. Every tick
    /// instant is strictly below this.
    pub fn end_bound(&self) -> Instant {
        (self.end + Duration::days(1)).and_time(NaiveTime::MIN)
    }
}
