//! Declarative date/time rules and their evaluator.
//!
//! A scheduled action fires at an instant iff its date rule AND its time
//! rule both match. Evaluation is pure: a function of the instant, the
//! configured resolution, and the trading calendar.
//!
//! Time rules use tick-span semantics: each tick owns the half-open
//! interval `[instant, instant + step)`, and a rule's target moment fires
//! at the unique tick whose span contains it. At Daily resolution a span
//! covers the whole day, so "30 minutes after open" fires on that day's
//! single tick; at Minute resolution it fires on the 10:00 tick. Spans
//! partition the timeline, so a target never fires twice.

use crate::calendar::{CalendarError, TradingCalendar};
use crate::domain::{Instant, Resolution};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Predicate over calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateRule {
    /// Every calendar date. Holiday suppression happens in the time rule:
    /// a date with no session makes every time rule evaluate false.
    EveryDay,
    /// A fixed day of the week.
    Weekly { weekday: Weekday },
    /// First trading day of each month.
    MonthStart,
    /// Last trading day of each month.
    MonthEnd,
    /// Third Friday of each month (standard option expiry).
    MonthlyExpiry,
    /// One exact date.
    On { date: NaiveDate },
}

/// Predicate over time of day, anchored to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeRule {
    /// N minutes after session open.
    AfterOpen { minutes: i64 },
    /// N minutes before session close.
    BeforeClose { minutes: i64 },
    /// A fixed wall-clock time (still suppressed on non-session dates).
    At { time: NaiveTime },
}

impl TimeRule {
    pub fn market_open() -> Self {
        TimeRule::AfterOpen { minutes: 0 }
    }

    pub fn market_close() -> Self {
        TimeRule::BeforeClose { minutes: 0 }
    }
}

/// Third Friday of the given month.
pub fn third_friday(year: i32, month: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
    let to_friday = (4 + 7 - first.weekday().num_days_from_monday()) % 7;
    first + Duration::days(to_friday as i64 + 14)
}

/// Pure rule evaluation against a trading calendar.
pub struct RuleEvaluator<'a> {
    calendar: &'a dyn TradingCalendar,
    resolution: Resolution,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(calendar: &'a dyn TradingCalendar, resolution: Resolution) -> Self {
        Self {
            calendar,
            resolution,
        }
    }

    /// True iff both rules match the instant.
    pub fn matches(
        &self,
        instant: Instant,
        date_rule: &DateRule,
        time_rule: &TimeRule,
    ) -> Result<bool, CalendarError> {
        Ok(self.matches_date(instant, date_rule)? && self.matches_time(instant, time_rule)?)
    }

    pub fn matches_date(
        &self,
        instant: Instant,
        rule: &DateRule,
    ) -> Result<bool, CalendarError> {
        let date = instant.date();
        match rule {
            DateRule::EveryDay => Ok(true),
            DateRule::Weekly { weekday } => Ok(date.weekday() == *weekday),
            DateRule::MonthStart => self.is_first_trading_day(date),
            DateRule::MonthEnd => self.is_last_trading_day(date),
            DateRule::MonthlyExpiry => Ok(date == third_friday(date.year(), date.month())),
            DateRule::On { date: target } => Ok(date == *target),
        }
    }

    pub fn matches_time(
        &self,
        instant: Instant,
        rule: &TimeRule,
    ) -> Result<bool, CalendarError> {
        let date = instant.date();
        // No session (weekend/holiday): nothing fires, whatever the rule.
        let open = match self.calendar.session_open(date)? {
            Some(open) => open,
            None => return Ok(false),
        };
        let target = match rule {
            TimeRule::AfterOpen { minutes } => open + Duration::minutes(*minutes),
            TimeRule::BeforeClose { minutes } => {
                let close = match self.calendar.session_close(date)? {
                    Some(close) => close,
                    None => return Ok(false),
                };
                close - Duration::minutes(*minutes)
            }
            TimeRule::At { time } => date.and_time(*time),
        };
        let span_end = instant + self.resolution.step();
        Ok(instant <= target && target < span_end)
    }

    fn is_first_trading_day(&self, date: NaiveDate) -> Result<bool, CalendarError> {
        if !self.calendar.is_trading_day(date)? {
            return Ok(false);
        }
        let mut earlier = date.with_day(1).expect("day 1 exists");
        while earlier < date {
            if self.calendar.is_trading_day(earlier)? {
                return Ok(false);
            }
            earlier += Duration::days(1);
        }
        Ok(true)
    }

    fn is_last_trading_day(&self, date: NaiveDate) -> Result<bool, CalendarError> {
        if !self.calendar.is_trading_day(date)? {
            return Ok(false);
        }
        let mut later = date + Duration::days(1);
        while later.month() == date.month() {
            if self.calendar.is_trading_day(later)? {
                return Ok(false);
            }
            later += Duration::days(1);
        }
        Ok(true)
    }
}
