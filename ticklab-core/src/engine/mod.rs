//! Engine — clock, schedule rules, scheduler, and the run lifecycle.

pub mod clock;
pub mod lifecycle;
pub mod rules;
pub mod scheduler;

pub use clock::{Clock, RangeExhausted};
pub use lifecycle::{
    run_backtest, CallbackError, CallbackFailure, CancelToken, EquityPoint, ErrorPolicy,
    InitContext, LifecycleState, RunConfig, RunError, RunReport, Strategy, TickContext,
};
pub use rules::{third_friday, DateRule, RuleEvaluator, TimeRule};
pub use scheduler::{DueAction, RegistrationId, Scheduler};
