//! Built-in strategy presets — the bridge between declarative
//! `StrategyConfig` and the runtime `Strategy` trait object consumed by
//! the lifecycle.

use ticklab_core::engine::{
    CallbackError, DateRule, InitContext, RegistrationId, Strategy, TickContext, TimeRule,
};

use crate::config::StrategyConfig;

/// Assemble the runtime strategy for a config section.
pub fn build_strategy(config: &StrategyConfig) -> Box<dyn Strategy> {
    match config {
        StrategyConfig::BuyAndHold { symbol, quantity } => {
            Box::new(BuyAndHold::new(symbol, *quantity))
        }
        StrategyConfig::MonthlyRebalance { symbols } => {
            Box::new(MonthlyRebalance::new(symbols.clone()))
        }
        StrategyConfig::ExpiryRoll { symbol, quantity } => {
            Box::new(ExpiryRoll::new(symbol, *quantity))
        }
    }
}

/// Buy a fixed quantity at the first session open, then hold to the end.
pub struct BuyAndHold {
    symbol: String,
    quantity: f64,
    entry: Option<RegistrationId>,
}

impl BuyAndHold {
    pub fn new(symbol: &str, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            entry: None,
        }
    }
}

impl Strategy for BuyAndHold {
    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> Result<(), CallbackError> {
        self.entry = Some(ctx.scheduler.register(
            DateRule::EveryDay,
            TimeRule::market_open(),
            "entry",
        ));
        Ok(())
    }

    fn on_scheduled(
        &mut self,
        _callback: &str,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), CallbackError> {
        let price = ctx.price(&self.symbol)?;
        ctx.ledger
            .open_or_adjust(&self.symbol, self.quantity, price)?;
        // Entry done: stop firing for the rest of the run.
        if let Some(entry) = self.entry.take() {
            ctx.scheduler.unregister(entry);
        }
        Ok(())
    }
}

/// Rebalance to equal weights on the first trading day of each month,
/// 30 minutes after open. Sells are applied before buys so reductions
/// free the cash the additions need.
pub struct MonthlyRebalance {
    symbols: Vec<String>,
}

impl MonthlyRebalance {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }
}

impl Strategy for MonthlyRebalance {
    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> Result<(), CallbackError> {
        ctx.scheduler.register(
            DateRule::MonthStart,
            TimeRule::AfterOpen { minutes: 30 },
            "rebalance",
        );
        Ok(())
    }

    fn on_scheduled(
        &mut self,
        _callback: &str,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), CallbackError> {
        let total = ctx.valuation()?;
        let target_value = total / self.symbols.len() as f64;

        let mut deltas = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let price = ctx.price(symbol)?;
            let held = ctx.ledger.position(symbol).map_or(0.0, |p| p.quantity);
            let target = (target_value / price).floor();
            let delta = target - held;
            if delta != 0.0 {
                deltas.push((symbol.clone(), delta, price));
            }
        }

        deltas.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("finite deltas"));
        for (symbol, delta, price) in deltas {
            ctx.ledger.open_or_adjust(&symbol, delta, price)?;
        }
        Ok(())
    }
}

/// Close and re-enter a position on each monthly option expiry (third
/// Friday), 15 minutes before the close.
pub struct ExpiryRoll {
    symbol: String,
    quantity: f64,
}

impl ExpiryRoll {
    pub fn new(symbol: &str, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
        }
    }
}

impl Strategy for ExpiryRoll {
    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> Result<(), CallbackError> {
        ctx.scheduler.register(
            DateRule::MonthlyExpiry,
            TimeRule::BeforeClose { minutes: 15 },
            "roll",
        );
        Ok(())
    }

    fn on_scheduled(
        &mut self,
        _callback: &str,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), CallbackError> {
        let price = ctx.price(&self.symbol)?;
        if ctx.ledger.has_position(&self.symbol) {
            ctx.ledger.close(&self.symbol, price)?;
        }
        ctx.ledger
            .open_or_adjust(&self.symbol, self.quantity, price)?;
        Ok(())
    }
}
