//! TickLab Core — strategy scheduling & execution engine.
//!
//! This crate contains the heart of the backtesting core:
//! - Domain types (simulation range, positions, the portfolio ledger)
//! - Gapless clock over a bounded date range
//! - Declarative date/time rules with a pure evaluator
//! - FIFO scheduler of named strategy callbacks
//! - Strategy lifecycle state machine driving one complete run
//! - Collaborator traits for the trading calendar and the price feed

pub mod calendar;
pub mod domain;
pub mod engine;
pub mod pricing;
