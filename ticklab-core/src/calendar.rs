//! Trading calendar collaborator — session anchors and trading-day queries.
//!
//! The core never decides what a trading day is; it asks this trait. Rule
//! evaluation treats a calendar failure as fatal (`CalendarUnavailable` in
//! the run taxonomy) — there is no meaningful scheduling without one.

use crate::domain::Instant;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("trading calendar unavailable: {0}")]
    Unavailable(String),
}

/// Market-hours collaborator. Implementations may be backed by exchange
/// data, a holiday file, or a fixture; the core only sees this surface.
pub trait TradingCalendar {
    /// Session open for `date`, or `None` when the market is closed all day.
    fn session_open(&self, date: NaiveDate) -> Result<Option<Instant>, CalendarError>;

    /// Session close for `date`, or `None` when the market is closed all day.
    fn session_close(&self, date: NaiveDate) -> Result<Option<Instant>, CalendarError>;

    fn is_trading_day(&self, date: NaiveDate) -> Result<bool, CalendarError>;
}

/// Weekday calendar with fixed session times and an explicit holiday set.
/// Covers US-equity-style backtests; anything fancier implements the trait.
#[derive(Debug, Clone)]
pub struct WeekdayCalendar {
    open: NaiveTime,
    close: NaiveTime,
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            open,
            close,
            holidays: BTreeSet::new(),
        }
    }

    /// US equity session: 09:30–16:00, Monday through Friday.
    pub fn us_equity() -> Self {
        Self::new(
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        )
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    fn is_session_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn session_open(&self, date: NaiveDate) -> Result<Option<Instant>, CalendarError> {
        Ok(self.is_session_day(date).then(|| date.and_time(self.open)))
    }

    fn session_close(&self, date: NaiveDate) -> Result<Option<Instant>, CalendarError> {
        Ok(self.is_session_day(date).then(|| date.and_time(self.close)))
    }

    fn is_trading_day(&self, date: NaiveDate) -> Result<bool, CalendarError> {
        Ok(self.is_session_day(date))
    }
}
