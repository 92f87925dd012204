//! Strategy lifecycle — the state machine that runs one complete backtest.
//!
//! One run wires together a fresh clock, scheduler, and ledger:
//! initialize funds the ledger and collects registrations, the clock then
//! drives the scheduler tick by tick, and the end-of-run hook receives the
//! final ledger snapshot. Terminal states are `Completed` and `Failed`;
//! a finished run is never resumed — parameter sweeps build new instances.
//!
//! Callbacks execute strictly sequentially on the calling thread. A
//! callback runs to completion before the next due callback is considered,
//! so the ledger needs no locking.

use crate::calendar::{CalendarError, TradingCalendar};
use crate::domain::{
    Instant, LedgerError, LedgerPolicy, LedgerSnapshot, PortfolioLedger, SimulationRange,
};
use crate::engine::clock::Clock;
use crate::engine::rules::RuleEvaluator;
use crate::engine::scheduler::Scheduler;
use crate::pricing::{PriceError, PriceFeed};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle states of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Running,
    Finalizing,
    Completed,
    Failed,
}

/// What to do when a scheduled callback fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Terminate the run on the first callback failure.
    #[default]
    FailFast,
    /// Record the failure and keep going, including the rest of the tick.
    ContinueAndLog,
}

/// Configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub range: SimulationRange,
    pub starting_cash: f64,
    #[serde(default)]
    pub ledger_policy: LedgerPolicy,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

/// Cooperative cancellation flag. The run checks it between ticks only —
/// a callback in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Error raised inside a user callback.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("{0}")]
    Other(String),
}

impl CallbackError {
    pub fn other(message: impl Into<String>) -> Self {
        CallbackError::Other(message.into())
    }
}

/// Run-level failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("initialize callback failed: {source}")]
    InitializeFailed {
        #[source]
        source: CallbackError,
    },

    #[error("callback '{callback}' failed at {instant}: {source}")]
    CallbackFailed {
        callback: String,
        instant: Instant,
        #[source]
        source: CallbackError,
    },

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Recorded callback failure under the continue-and-log policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackFailure {
    pub callback: String,
    pub instant: Instant,
    pub message: String,
}

/// Portfolio value at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub instant: Instant,
    pub equity: f64,
}

/// Everything a run produces. `state` is always `Completed` or `Failed`;
/// on failure `error` carries the cause and the ledger fields hold
/// whatever state existed when the run stopped.
#[derive(Debug)]
pub struct RunReport {
    pub state: LifecycleState,
    pub error: Option<RunError>,
    pub ticks: usize,
    pub equity_curve: Vec<EquityPoint>,
    pub final_snapshot: LedgerSnapshot,
    pub final_valuation: f64,
    pub callback_failures: Vec<CallbackFailure>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.state == LifecycleState::Completed
    }
}

/// Context handed to `initialize`: registrations and initial funding
/// happen here, before the first tick.
pub struct InitContext<'a> {
    pub scheduler: &'a mut Scheduler,
    pub ledger: &'a mut PortfolioLedger,
    pub calendar: &'a dyn TradingCalendar,
}

/// Context handed to each scheduled callback.
pub struct TickContext<'a> {
    pub instant: Instant,
    pub scheduler: &'a mut Scheduler,
    pub ledger: &'a mut PortfolioLedger,
    pub prices: &'a dyn PriceFeed,
    pub calendar: &'a dyn TradingCalendar,
}

impl TickContext<'_> {
    /// Price of `symbol` at the current instant.
    pub fn price(&self, symbol: &str) -> Result<f64, CallbackError> {
        Ok(self.prices.price_at(symbol, self.instant)?)
    }

    /// Strict valuation of the ledger at current feed prices. Fails with
    /// `MissingPrice` if the feed cannot serve a held symbol.
    pub fn valuation(&self) -> Result<f64, CallbackError> {
        let mut snapshot = HashMap::new();
        for pos in self.ledger.positions() {
            snapshot.insert(
                pos.symbol.clone(),
                self.prices.price_at(&pos.symbol, self.instant)?,
            );
        }
        Ok(self.ledger.valuation(&snapshot)?)
    }
}

/// The strategy capability set: initialize, named scheduled callbacks,
/// end-of-run. Registrations made in `initialize` bind a callback name;
/// the lifecycle dispatches due actions back through `on_scheduled`.
pub trait Strategy {
    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> Result<(), CallbackError>;

    fn on_scheduled(
        &mut self,
        callback: &str,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), CallbackError> {
        let _ = ctx;
        Err(CallbackError::other(format!(
            "unknown scheduled callback '{callback}'"
        )))
    }

    /// Invoked once on the clean path with the final ledger snapshot.
    /// An error here is logged; the run still completes.
    fn on_end(&mut self, snapshot: &LedgerSnapshot) -> Result<(), CallbackError> {
        let _ = snapshot;
        Ok(())
    }
}

/// Run one complete backtest. Always returns a report; `report.state`
/// and `report.error` carry the outcome.
pub fn run_backtest(
    strategy: &mut dyn Strategy,
    config: &RunConfig,
    calendar: &dyn TradingCalendar,
    prices: &dyn PriceFeed,
    cancel: Option<&CancelToken>,
) -> RunReport {
    let mut run = Run::new(config);
    log::debug!(
        "run starting: {}..{} at {:?}",
        config.range.start(),
        config.range.end(),
        config.range.resolution()
    );

    if let Err(err) = run.validate(config) {
        return run.fail(err);
    }

    // Uninitialized -> Initializing: fund the ledger, let the strategy
    // register its actions.
    run.state = LifecycleState::Initializing;
    if config.starting_cash > 0.0 {
        if let Err(err) = run.ledger.deposit(config.starting_cash) {
            return run.fail(RunError::InvalidConfig(format!(
                "starting cash rejected: {err}"
            )));
        }
    }
    {
        let mut ctx = InitContext {
            scheduler: &mut run.scheduler,
            ledger: &mut run.ledger,
            calendar,
        };
        if let Err(source) = strategy.initialize(&mut ctx) {
            return run.fail(RunError::InitializeFailed { source });
        }
    }

    // Initializing -> Running: the clock now drives the scheduler.
    run.state = LifecycleState::Running;
    let evaluator = RuleEvaluator::new(calendar, config.range.resolution());

    loop {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            log::debug!("run cancelled after {} ticks", run.ticks);
            break;
        }
        let instant = match run.clock.advance() {
            Ok(instant) => instant,
            Err(_) => break, // RangeExhausted: clean end of range
        };

        let due = match run.scheduler.due(instant, &evaluator) {
            Ok(due) => due,
            Err(err) => return run.fail(RunError::Calendar(err)),
        };

        for action in due {
            let mut ctx = TickContext {
                instant,
                scheduler: &mut run.scheduler,
                ledger: &mut run.ledger,
                prices,
                calendar,
            };
            if let Err(source) = strategy.on_scheduled(&action.callback, &mut ctx) {
                match config.error_policy {
                    ErrorPolicy::FailFast => {
                        return run.fail(RunError::CallbackFailed {
                            callback: action.callback,
                            instant,
                            source,
                        });
                    }
                    ErrorPolicy::ContinueAndLog => {
                        log::warn!(
                            "callback '{}' failed at {instant}: {source}",
                            action.callback
                        );
                        run.callback_failures.push(CallbackFailure {
                            callback: action.callback,
                            instant,
                            message: source.to_string(),
                        });
                    }
                }
            }
        }

        run.mark_to_market(instant, prices);
        run.ticks += 1;
    }

    // Running -> Finalizing -> Completed.
    run.state = LifecycleState::Finalizing;
    let snapshot = run.ledger.snapshot();
    if let Err(err) = strategy.on_end(&snapshot) {
        log::warn!("on_end failed (run still completes): {err}");
    }
    run.state = LifecycleState::Completed;
    log::debug!("run completed: {} ticks", run.ticks);
    run.into_report(None)
}

/// Per-run mutable state, torn down with the run. No process-wide
/// singletons: independent runs coexist in one process.
struct Run {
    state: LifecycleState,
    clock: Clock,
    scheduler: Scheduler,
    ledger: PortfolioLedger,
    ticks: usize,
    equity_curve: Vec<EquityPoint>,
    callback_failures: Vec<CallbackFailure>,
    /// Last price the feed served per symbol, carried forward across
    /// instants the feed cannot price.
    last_marks: HashMap<String, f64>,
}

impl Run {
    fn new(config: &RunConfig) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            clock: Clock::new(config.range),
            scheduler: Scheduler::new(),
            ledger: PortfolioLedger::new(config.ledger_policy),
            ticks: 0,
            equity_curve: Vec::new(),
            callback_failures: Vec::new(),
            last_marks: HashMap::new(),
        }
    }

    fn validate(&self, config: &RunConfig) -> Result<(), RunError> {
        if !config.starting_cash.is_finite() || config.starting_cash < 0.0 {
            return Err(RunError::InvalidConfig(format!(
                "starting cash must be finite and non-negative, got {}",
                config.starting_cash
            )));
        }
        Ok(())
    }

    /// Refresh marks for held symbols and record an equity point. A symbol
    /// the feed never priced is marked at its average cost.
    fn mark_to_market(&mut self, instant: Instant, prices: &dyn PriceFeed) {
        for pos in self.ledger.positions() {
            if let Ok(price) = prices.price_at(&pos.symbol, instant) {
                self.last_marks.insert(pos.symbol.clone(), price);
            }
        }
        let equity = self.marked_value();
        self.equity_curve.push(EquityPoint { instant, equity });
    }

    fn marked_value(&self) -> f64 {
        let position_value: f64 = self
            .ledger
            .positions()
            .map(|pos| {
                let price = self
                    .last_marks
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.avg_cost);
                pos.market_value(price)
            })
            .sum();
        self.ledger.cash() + position_value
    }

    fn fail(mut self, error: RunError) -> RunReport {
        log::warn!("run failed: {error}");
        self.state = LifecycleState::Failed;
        self.into_report(Some(error))
    }

    fn into_report(self, error: Option<RunError>) -> RunReport {
        let final_valuation = self.marked_value();
        RunReport {
            state: self.state,
            error,
            ticks: self.ticks,
            equity_curve: self.equity_curve,
            final_snapshot: self.ledger.snapshot(),
            final_valuation,
            callback_failures: self.callback_failures,
        }
    }
}
