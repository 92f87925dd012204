//! Portfolio ledger — the authoritative record of cash and positions.
//!
//! All mutation goes through five operations: `deposit`, `withdraw`,
//! `open_or_adjust`, `close`, and nothing else. Valuation queries are
//! read-only. The accounting identity must hold at every valuation:
//! `valuation(prices) == cash + sum(quantity * price)`.

use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Price-per-symbol snapshot used by [`PortfolioLedger::valuation`].
pub type PriceSnapshot = HashMap<String, f64>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient cash: requested {requested:.2}, available {available:.2}")]
    InsufficientCash { requested: f64, available: f64 },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("no open position in '{symbol}'")]
    NoPosition { symbol: String },

    #[error("no price for held symbol '{symbol}' in snapshot")]
    MissingPrice { symbol: String },
}

/// Cash and position policies for one run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LedgerPolicy {
    /// Cash may go negative (withdrawals and purchases on margin).
    pub allow_margin: bool,
    /// A single adjustment may cross through zero and reverse direction.
    pub allow_position_flip: bool,
}

/// Immutable copy of ledger state, handed to `on_end` and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub cash: f64,
    pub realized_pnl: f64,
    /// Open positions sorted by symbol for deterministic output.
    pub positions: Vec<Position>,
}

impl LedgerSnapshot {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

/// Aggregate portfolio state for a single run.
#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    cash: f64,
    positions: HashMap<String, Position>,
    realized_pnl: f64,
    policy: LedgerPolicy,
}

impl PortfolioLedger {
    pub fn new(policy: LedgerPolicy) -> Self {
        Self {
            cash: 0.0,
            positions: HashMap::new(),
            realized_pnl: 0.0,
            policy,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Add cash to the ledger.
    pub fn deposit(&mut self, amount: f64) -> Result<(), LedgerError> {
        check_amount(amount)?;
        self.cash += amount;
        Ok(())
    }

    /// Remove cash from the ledger. Fails with `InsufficientCash` when the
    /// balance would go negative and margin is disabled.
    pub fn withdraw(&mut self, amount: f64) -> Result<(), LedgerError> {
        check_amount(amount)?;
        if amount > self.cash && !self.policy.allow_margin {
            return Err(LedgerError::InsufficientCash {
                requested: amount,
                available: self.cash,
            });
        }
        self.cash -= amount;
        Ok(())
    }

    /// Trade `delta_quantity` units of `symbol` at `price`, opening,
    /// increasing, reducing, or (policy permitting) flipping the position.
    ///
    /// Increases recompute the weighted average cost; reductions realize
    /// P&L against the held average cost. The operation is atomic: on any
    /// error the ledger is unchanged.
    pub fn open_or_adjust(
        &mut self,
        symbol: &str,
        delta_quantity: f64,
        price: f64,
    ) -> Result<(), LedgerError> {
        if !delta_quantity.is_finite() || delta_quantity == 0.0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "delta for '{symbol}' must be finite and non-zero, got {delta_quantity}"
            )));
        }
        check_amount(price)?;

        let old_quantity = self.positions.get(symbol).map_or(0.0, |p| p.quantity);
        let new_quantity = old_quantity + delta_quantity;
        let flips = old_quantity != 0.0
            && new_quantity != 0.0
            && new_quantity.signum() != old_quantity.signum();
        if flips && !self.policy.allow_position_flip {
            return Err(LedgerError::InvalidQuantity(format!(
                "adjustment of {delta_quantity} would flip '{symbol}' from {old_quantity} \
                 through zero (position flips are disabled)"
            )));
        }

        let cost = delta_quantity * price;
        let new_cash = self.cash - cost;
        if new_cash < 0.0 && !self.policy.allow_margin {
            return Err(LedgerError::InsufficientCash {
                requested: cost,
                available: self.cash,
            });
        }

        // All checks passed; mutate.
        self.cash = new_cash;

        match self.positions.get_mut(symbol) {
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    Position {
                        symbol: symbol.to_string(),
                        quantity: delta_quantity,
                        avg_cost: price,
                    },
                );
            }
            Some(pos) if flips => {
                // Realize the entire old position, open the residual fresh.
                self.realized_pnl += old_quantity * (price - pos.avg_cost);
                pos.quantity = new_quantity;
                pos.avg_cost = price;
            }
            Some(pos) if delta_quantity.signum() == old_quantity.signum() => {
                // Same-direction increase: weighted average cost.
                pos.avg_cost = (old_quantity.abs() * pos.avg_cost
                    + delta_quantity.abs() * price)
                    / new_quantity.abs();
                pos.quantity = new_quantity;
            }
            Some(pos) => {
                // Reduction toward zero: average cost unchanged, realize the
                // closed portion.
                let closed = delta_quantity.abs();
                self.realized_pnl += closed * (price - pos.avg_cost) * old_quantity.signum();
                pos.quantity = new_quantity;
            }
        }

        if new_quantity == 0.0 {
            self.positions.remove(symbol);
        }
        Ok(())
    }

    /// Close the full position in `symbol` at `price`, realizing its P&L.
    pub fn close(&mut self, symbol: &str, price: f64) -> Result<f64, LedgerError> {
        check_amount(price)?;
        let pos = self
            .positions
            .remove(symbol)
            .ok_or_else(|| LedgerError::NoPosition {
                symbol: symbol.to_string(),
            })?;
        let realized = pos.quantity * (price - pos.avg_cost);
        self.cash += pos.quantity * price;
        self.realized_pnl += realized;
        Ok(realized)
    }

    /// Total portfolio value: cash + sum of position market values.
    /// Fails with `MissingPrice` if any held symbol is absent from the
    /// snapshot; never mutates.
    pub fn valuation(&self, prices: &PriceSnapshot) -> Result<f64, LedgerError> {
        let mut total = self.cash;
        for (symbol, pos) in &self.positions {
            let price = prices
                .get(symbol)
                .ok_or_else(|| LedgerError::MissingPrice {
                    symbol: symbol.clone(),
                })?;
            total += pos.market_value(*price);
        }
        Ok(total)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        LedgerSnapshot {
            cash: self.cash,
            realized_pnl: self.realized_pnl,
            positions,
        }
    }
}

fn check_amount(amount: f64) -> Result<(), LedgerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
