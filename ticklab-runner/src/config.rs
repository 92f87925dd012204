//! Serializable run configuration.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use ticklab_core::domain::{LedgerPolicy, RangeError, Resolution, SimulationRange};
use ticklab_core::engine::{ErrorPolicy, RunConfig};

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for a single backtest run.
///
/// Captures everything needed to reproduce the run: the date range and
/// resolution, starting cash and ledger policies, the strategy, the price
/// file, and the calendar. Two configs with identical content share a
/// [`RunId`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    /// Backtest start date (inclusive)
    pub start_date: NaiveDate,

    /// Backtest end date (inclusive)
    pub end_date: NaiveDate,

    #[serde(default = "default_resolution")]
    pub resolution: Resolution,

    pub starting_cash: f64,

    #[serde(default)]
    pub allow_margin: bool,

    #[serde(default)]
    pub allow_position_flip: bool,

    #[serde(default)]
    pub error_policy: ErrorPolicy,

    pub strategy: StrategyConfig,

    pub prices: PricesConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

fn default_resolution() -> Resolution {
    Resolution::Daily
}

/// Strategy preset configuration (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Buy a fixed quantity at the first session open, then hold.
    BuyAndHold { symbol: String, quantity: f64 },

    /// Rebalance to equal weights on the first trading day of each month,
    /// 30 minutes after open.
    MonthlyRebalance { symbols: Vec<String> },

    /// Liquidate and re-enter on each monthly option expiry (third Friday).
    ExpiryRoll { symbol: String, quantity: f64 },
}

/// Where daily closes come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricesConfig {
    /// CSV file with `date,symbol,close` rows.
    pub csv: PathBuf,
}

/// Trading calendar parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfig {
    #[serde(default = "default_open")]
    pub session_open: NaiveTime,

    #[serde(default = "default_close")]
    pub session_close: NaiveTime,

    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

fn default_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).expect("valid time")
}

fn default_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).expect("valid time")
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            session_open: default_open(),
            session_close: default_close(),
            holidays: Vec::new(),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Range construction enforces start <= end.
        self.range()?;
        if !self.starting_cash.is_finite() || self.starting_cash < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "starting_cash must be finite and non-negative, got {}",
                self.starting_cash
            )));
        }
        if let StrategyConfig::MonthlyRebalance { symbols } = &self.strategy {
            if symbols.is_empty() {
                return Err(ConfigError::Invalid(
                    "MONTHLY_REBALANCE needs at least one symbol".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn range(&self) -> Result<SimulationRange, RangeError> {
        SimulationRange::new(self.start_date, self.end_date, self.resolution)
    }

    /// Core run configuration derived from this file.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        Ok(RunConfig {
            range: self.range()?,
            starting_cash: self.starting_cash,
            ledger_policy: LedgerPolicy {
                allow_margin: self.allow_margin,
                allow_position_flip: self.allow_position_flip,
            },
            error_policy: self.error_policy,
        })
    }

    /// Deterministic hash ID for this configuration. Two runs with
    /// identical configs share cached artifacts.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
            start_date = "2020-01-01"
            end_date = "2020-12-31"
            resolution = "daily"
            starting_cash = 100000.0

            [strategy]
            type = "BUY_AND_HOLD"
            symbol = "SPY"
            quantity = 100.0

            [prices]
            csv = "prices.csv"

            [calendar]
            holidays = ["2020-01-01", "2020-12-25"]
        "#
    }

    #[test]
    fn parses_sample_toml() {
        let config: BacktestConfig = toml::from_str(sample_toml()).unwrap();
        assert_eq!(config.resolution, Resolution::Daily);
        assert_eq!(config.starting_cash, 100_000.0);
        assert_eq!(config.error_policy, ErrorPolicy::FailFast);
        assert!(!config.allow_margin);
        assert_eq!(config.calendar.holidays.len(), 2);
        assert!(matches!(
            config.strategy,
            StrategyConfig::BuyAndHold { ref symbol, quantity }
                if symbol == "SPY" && quantity == 100.0
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn identical_configs_share_run_id() {
        let a: BacktestConfig = toml::from_str(sample_toml()).unwrap();
        let b: BacktestConfig = toml::from_str(sample_toml()).unwrap();
        assert_eq!(a.run_id(), b.run_id());
    }

    #[test]
    fn run_id_changes_with_content() {
        let a: BacktestConfig = toml::from_str(sample_toml()).unwrap();
        let mut b = a.clone();
        b.starting_cash = 50_000.0;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn inverted_dates_fail_validation() {
        let mut config: BacktestConfig = toml::from_str(sample_toml()).unwrap();
        config.start_date = config.end_date + chrono::Duration::days(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_rebalance_universe_rejected() {
        let mut config: BacktestConfig = toml::from_str(sample_toml()).unwrap();
        config.strategy = StrategyConfig::MonthlyRebalance { symbols: vec![] };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn calendar_defaults_are_us_equity_hours() {
        let config = CalendarConfig::default();
        assert_eq!(config.session_open, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(config.session_close, NaiveTime::from_hms_opt(16, 0, 0).unwrap());
    }
}
