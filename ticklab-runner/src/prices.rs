//! CSV price loading — `date,symbol,close` rows into a table feed.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ticklab_core::pricing::TablePriceFeed;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open price file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("bad price row {row}: {source}")]
    BadRow {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("bad price row {row}: close {close} for '{symbol}' is not a positive number")]
    BadClose {
        row: usize,
        symbol: String,
        close: f64,
    },
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    symbol: String,
    close: f64,
}

/// Load a `date,symbol,close` CSV (header required) into a price feed.
pub fn load_prices(path: &Path) -> Result<TablePriceFeed, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut feed = TablePriceFeed::new();
    for (index, record) in reader.deserialize::<PriceRow>().enumerate() {
        // Header is row 1; first data row is row 2.
        let row = index + 2;
        let parsed = record.map_err(|source| LoadError::BadRow { row, source })?;
        if !parsed.close.is_finite() || parsed.close <= 0.0 {
            return Err(LoadError::BadClose {
                row,
                symbol: parsed.symbol,
                close: parsed.close,
            });
        }
        feed.insert(&parsed.symbol, parsed.date, parsed.close);
    }
    Ok(feed)
}
