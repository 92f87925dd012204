//! Domain types for TickLab

pub mod ledger;
pub mod position;
pub mod range;

pub use ledger::{LedgerError, LedgerPolicy, LedgerSnapshot, PortfolioLedger, PriceSnapshot};
pub use position::Position;
pub use range::{Instant, RangeError, Resolution, SimulationRange};

/// Symbol type alias
pub type Symbol = String;
