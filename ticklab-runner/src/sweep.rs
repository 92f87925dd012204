//! Parameter sweep — independent runs over a config grid, in parallel.
//!
//! Every run gets its own clock, scheduler, and ledger; the only shared
//! state is the read-only price table, so runs parallelize freely.

use rayon::prelude::*;
use ticklab_core::pricing::TablePriceFeed;

use crate::config::{BacktestConfig, StrategyConfig};
use crate::prices::{load_prices, LoadError};
use crate::runner::{run_with_feed, RunSummary, RunnerError};

/// Parameter grid: the cartesian product of the listed axes, applied to a
/// base config. Empty axes keep the base value.
#[derive(Debug, Clone, Default)]
pub struct SweepGrid {
    pub starting_cash: Vec<f64>,
    pub strategies: Vec<StrategyConfig>,
}

impl SweepGrid {
    /// Total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.starting_cash.len().max(1) * self.strategies.len().max(1)
    }

    /// Generate all configurations of the grid.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let cash_axis: Vec<f64> = if self.starting_cash.is_empty() {
            vec![base.starting_cash]
        } else {
            self.starting_cash.clone()
        };
        let strategy_axis: Vec<StrategyConfig> = if self.strategies.is_empty() {
            vec![base.strategy.clone()]
        } else {
            self.strategies.clone()
        };

        let mut configs = Vec::with_capacity(cash_axis.len() * strategy_axis.len());
        for &cash in &cash_axis {
            for strategy in &strategy_axis {
                let mut config = base.clone();
                config.starting_cash = cash;
                config.strategy = strategy.clone();
                configs.push(config);
            }
        }
        configs
    }
}

/// One sweep entry: the config that ran and what came of it.
#[derive(Debug)]
pub struct SweepEntry {
    pub config: BacktestConfig,
    pub result: Result<RunSummary, RunnerError>,
}

/// Run the whole grid. Loads the base config's price file once and shares
/// it across all runs.
pub fn run_sweep(base: &BacktestConfig, grid: &SweepGrid) -> Result<Vec<SweepEntry>, LoadError> {
    let feed = load_prices(&base.prices.csv)?;
    Ok(run_sweep_with_feed(base, grid, &feed))
}

/// Like [`run_sweep`] but with a pre-loaded feed.
pub fn run_sweep_with_feed(
    base: &BacktestConfig,
    grid: &SweepGrid,
    feed: &TablePriceFeed,
) -> Vec<SweepEntry> {
    let configs = grid.generate_configs(base);
    log::info!("sweep: {} configurations", configs.len());
    configs
        .into_par_iter()
        .map(|config| {
            let result = run_with_feed(&config, feed, None);
            SweepEntry { config, result }
        })
        .collect()
}
