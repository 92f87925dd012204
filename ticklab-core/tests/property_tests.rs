//! Property tests for core invariants.
//!
//! Uses proptest to verify:
//! 1. Valuation identity — cash + sum(quantity * price) after any op sequence
//! 2. Wealth accounting — valuation = net deposits + realized + unrealized
//! 3. Clock monotonicity — ticks strictly increase, gapless, exact count
//! 4. Scheduler FIFO — due sets are always in registration order

use chrono::{Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;
use std::collections::HashMap;
use ticklab_core::calendar::WeekdayCalendar;
use ticklab_core::domain::{LedgerPolicy, PortfolioLedger, Resolution, SimulationRange};
use ticklab_core::engine::{Clock, DateRule, RuleEvaluator, Scheduler, TimeRule};

// ── Strategies (proptest) ────────────────────────────────────────────

#[derive(Debug, Clone)]
enum LedgerOp {
    Deposit(f64),
    Withdraw(f64),
    Adjust { symbol: usize, delta: f64, price: f64 },
    Close { symbol: usize, price: f64 },
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (1.0..10_000.0_f64).prop_map(LedgerOp::Deposit),
        (1.0..10_000.0_f64).prop_map(LedgerOp::Withdraw),
        (0..3_usize, -50.0..50.0_f64, arb_price())
            .prop_map(|(symbol, delta, price)| LedgerOp::Adjust {
                symbol,
                delta: delta.round(),
                price
            }),
        (0..3_usize, arb_price()).prop_map(|(symbol, price)| LedgerOp::Close { symbol, price }),
    ]
}

const SYMBOLS: [&str; 3] = ["SPY", "QQQ", "IWM"];

// ── 1 & 2. Ledger accounting ─────────────────────────────────────────

proptest! {
    /// After any op sequence, valuation over the last-trade prices equals
    /// cash + sum(quantity * price), tracked independently of the ledger.
    #[test]
    fn valuation_identity_holds(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut ledger = PortfolioLedger::new(LedgerPolicy {
            allow_margin: true,
            allow_position_flip: true,
        });
        let mut shadow_cash = 0.0_f64;
        let mut shadow_qty: HashMap<&str, f64> = HashMap::new();
        let mut last_price: HashMap<String, f64> = HashMap::new();

        for op in &ops {
            match *op {
                LedgerOp::Deposit(amount) => {
                    ledger.deposit(amount).unwrap();
                    shadow_cash += amount;
                }
                LedgerOp::Withdraw(amount) => {
                    ledger.withdraw(amount).unwrap();
                    shadow_cash -= amount;
                }
                LedgerOp::Adjust { symbol, delta, price } => {
                    let symbol = SYMBOLS[symbol];
                    if ledger.open_or_adjust(symbol, delta, price).is_ok() {
                        shadow_cash -= delta * price;
                        *shadow_qty.entry(symbol).or_default() += delta;
                        last_price.insert(symbol.to_string(), price);
                    }
                }
                LedgerOp::Close { symbol, price } => {
                    let symbol = SYMBOLS[symbol];
                    if ledger.close(symbol, price).is_ok() {
                        let qty = shadow_qty.remove(symbol).unwrap_or(0.0);
                        shadow_cash += qty * price;
                        last_price.insert(symbol.to_string(), price);
                    }
                }
            }
        }

        let expected: f64 = shadow_cash
            + shadow_qty
                .iter()
                .filter(|(_, &q)| q != 0.0)
                .map(|(sym, q)| q * last_price[&sym.to_string()])
                .sum::<f64>();
        let valuation = ledger.valuation(&last_price).unwrap();
        prop_assert!(
            (valuation - expected).abs() < 1e-6,
            "valuation {valuation} != shadow {expected}"
        );
    }

    /// Valuation decomposes into net deposits + realized + unrealized P&L.
    #[test]
    fn wealth_decomposition(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut ledger = PortfolioLedger::new(LedgerPolicy {
            allow_margin: true,
            allow_position_flip: true,
        });
        let mut net_deposits = 0.0_f64;
        let mut last_price: HashMap<String, f64> = HashMap::new();

        for op in &ops {
            match *op {
                LedgerOp::Deposit(amount) => {
                    ledger.deposit(amount).unwrap();
                    net_deposits += amount;
                }
                LedgerOp::Withdraw(amount) => {
                    ledger.withdraw(amount).unwrap();
                    net_deposits -= amount;
                }
                LedgerOp::Adjust { symbol, delta, price } => {
                    let symbol = SYMBOLS[symbol];
                    if ledger.open_or_adjust(symbol, delta, price).is_ok() {
                        last_price.insert(symbol.to_string(), price);
                    }
                }
                LedgerOp::Close { symbol, price } => {
                    let symbol = SYMBOLS[symbol];
                    if ledger.close(symbol, price).is_ok() {
                        last_price.insert(symbol.to_string(), price);
                    }
                }
            }
        }

        let unrealized: f64 = ledger
            .positions()
            .map(|pos| pos.unrealized_pnl(last_price[&pos.symbol]))
            .sum();
        let valuation = ledger.valuation(&last_price).unwrap();
        let expected = net_deposits + ledger.realized_pnl() + unrealized;
        prop_assert!(
            (valuation - expected).abs() < 1e-6,
            "valuation {valuation} != deposits {net_deposits} + realized {} + unrealized {unrealized}",
            ledger.realized_pnl()
        );
    }
}

// ── 3. Clock ─────────────────────────────────────────────────────────

proptest! {
    /// Daily ticks are strictly increasing, gapless, and cover the range
    /// inclusively.
    #[test]
    fn clock_ticks_are_monotone_and_gapless(
        start_offset in 0..3000_i64,
        span_days in 0..400_i64,
    ) {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Duration::days(start_offset);
        let end = start + Duration::days(span_days);
        let range = SimulationRange::new(start, end, Resolution::Daily).unwrap();
        let mut clock = Clock::new(range);

        let mut previous = None;
        let mut count = 0_i64;
        while let Ok(instant) = clock.advance() {
            if let Some(prev) = previous {
                prop_assert!(instant > prev);
                prop_assert_eq!(instant - prev, Duration::days(1));
            }
            previous = Some(instant);
            count += 1;
        }
        prop_assert_eq!(count, span_days + 1);
        prop_assert_eq!(previous.unwrap().date(), end);
    }
}

// ── 4. Scheduler FIFO ────────────────────────────────────────────────

proptest! {
    /// Whatever subset of registrations matches, the due set preserves
    /// registration order.
    #[test]
    fn due_set_preserves_registration_order(count in 1..20_usize) {
        let calendar = WeekdayCalendar::us_equity();
        let evaluator = RuleEvaluator::new(&calendar, Resolution::Daily);
        let mut scheduler = Scheduler::new();
        for i in 0..count {
            // Alternate rules so only half match a Monday.
            let date_rule = if i % 2 == 0 {
                DateRule::EveryDay
            } else {
                DateRule::Weekly {
                    weekday: chrono::Weekday::Tue,
                }
            };
            scheduler.register(date_rule, TimeRule::market_open(), format!("cb{i}"));
        }

        // 2020-01-06 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2020, 1, 6)
            .unwrap()
            .and_time(NaiveTime::MIN);
        let due = scheduler.due(monday, &evaluator).unwrap();
        prop_assert_eq!(due.len(), count.div_ceil(2));
        for pair in due.windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
        }
    }
}
