//! Single-run entry point — wires config, prices, calendar, and strategy
//! into one lifecycle run and condenses the report for persistence.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use ticklab_core::calendar::WeekdayCalendar;
use ticklab_core::domain::Position;
use ticklab_core::engine::{
    run_backtest, CallbackFailure, CancelToken, EquityPoint, LifecycleState,
};
use ticklab_core::pricing::TablePriceFeed;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::prices::{load_prices, LoadError};
use crate::presets::build_strategy;

/// Errors from the runner's own plumbing. A *failed run* is not an error
/// here — it comes back as a summary with `state == Failed`.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Prices(#[from] LoadError),

    #[error("cannot write summary '{path}': {source}")]
    Export {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Serializable condensation of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub state: LifecycleState,
    /// Failure cause when `state == Failed`.
    pub error: Option<String>,
    pub ticks: usize,
    pub starting_cash: f64,
    pub final_valuation: f64,
    pub final_cash: f64,
    pub realized_pnl: f64,
    pub positions: Vec<Position>,
    pub equity_curve: Vec<EquityPoint>,
    pub callback_failures: Vec<CallbackFailure>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunSummary {
    pub fn is_completed(&self) -> bool {
        self.state == LifecycleState::Completed
    }
}

/// Run one backtest described by `config`. Loads prices, builds the
/// calendar and the strategy preset, runs the lifecycle, and condenses
/// the report.
pub fn run_from_config(
    config: &BacktestConfig,
    cancel: Option<&CancelToken>,
) -> Result<RunSummary, RunnerError> {
    let feed = load_prices(&config.prices.csv)?;
    run_with_feed(config, &feed, cancel)
}

/// Like [`run_from_config`] but with a pre-loaded feed — sweeps load the
/// price table once and share it across runs.
pub fn run_with_feed(
    config: &BacktestConfig,
    feed: &TablePriceFeed,
    cancel: Option<&CancelToken>,
) -> Result<RunSummary, RunnerError> {
    let run_config = config.run_config()?;
    let calendar = WeekdayCalendar::new(
        config.calendar.session_open,
        config.calendar.session_close,
    )
    .with_holidays(config.calendar.holidays.iter().copied());
    let mut strategy = build_strategy(&config.strategy);

    log::info!(
        "running {} [{}..{}]",
        config.run_id(),
        config.start_date,
        config.end_date
    );
    let report = run_backtest(strategy.as_mut(), &run_config, &calendar, feed, cancel);

    Ok(RunSummary {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        state: report.state,
        error: report.error.as_ref().map(|e| e.to_string()),
        ticks: report.ticks,
        starting_cash: config.starting_cash,
        final_valuation: report.final_valuation,
        final_cash: report.final_snapshot.cash,
        realized_pnl: report.final_snapshot.realized_pnl,
        positions: report.final_snapshot.positions.clone(),
        equity_curve: report.equity_curve,
        callback_failures: report.callback_failures,
    })
}

/// Persist a summary as pretty-printed JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), RunnerError> {
    let json = serde_json::to_string_pretty(summary).expect("RunSummary serialization failed");
    std::fs::write(path, json).map_err(|source| RunnerError::Export {
        path: path.to_path_buf(),
        source,
    })
}
