//! TickLab Runner — run orchestration on top of `ticklab-core`.
//!
//! This crate provides:
//! - TOML run configuration with a content-addressed run id
//! - CSV price loading into the core's table feed
//! - Built-in strategy presets (buy-and-hold, monthly rebalance, expiry roll)
//! - Single-run entry point and JSON summary export
//! - Parallel parameter sweeps over a config grid

pub mod config;
pub mod presets;
pub mod prices;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, CalendarConfig, ConfigError, PricesConfig, RunId, StrategyConfig};
pub use presets::build_strategy;
pub use prices::{load_prices, LoadError};
pub use runner::{run_from_config, run_with_feed, write_summary_json, RunSummary, RunnerError};
pub use sweep::{run_sweep, run_sweep_with_feed, SweepEntry, SweepGrid};
