//! Price-feed collaborator and a table-backed reference implementation.

use crate::domain::Instant;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("no price for symbol '{symbol}' at {instant}")]
    MissingPrice { symbol: String, instant: Instant },
}

/// Historical price lookup. The core calls this once per symbol per mark;
/// implementations may be backed by a database, a file, or a fixture.
pub trait PriceFeed {
    fn price_at(&self, symbol: &str, instant: Instant) -> Result<f64, PriceError>;
}

/// In-memory feed of daily closes. Lookup returns the most recent close at
/// or before the instant's date, so weekend and holiday instants resolve to
/// the prior session's close.
#[derive(Debug, Clone, Default)]
pub struct TablePriceFeed {
    by_symbol: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl TablePriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, date: NaiveDate, close: f64) {
        self.by_symbol
            .entry(symbol.to_string())
            .or_default()
            .insert(date, close);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.by_symbol.keys().map(|s| s.as_str())
    }
}

impl PriceFeed for TablePriceFeed {
    fn price_at(&self, symbol: &str, instant: Instant) -> Result<f64, PriceError> {
        self.by_symbol
            .get(symbol)
            .and_then(|series| {
                series
                    .range(..=instant.date())
                    .next_back()
                    .map(|(_, &price)| price)
            })
            .ok_or_else(|| PriceError::MissingPrice {
                symbol: symbol.to_string(),
                instant,
            })
    }
}
