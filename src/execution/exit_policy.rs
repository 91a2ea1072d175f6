use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Position;

use super::random::RandomSource;

/// Closing rules, evaluated in order; the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRules {
    /// Close at or above this P&L percent (default 30).
    pub take_profit_pct: Decimal,
    /// Close at or below this P&L percent (default -25).
    pub stop_loss_pct: Decimal,
    /// Close when the mark is strictly above this price (default 0.90).
    pub near_resolution_price: Decimal,
    /// Chance of banking a profitable position anyway (default 5%).
    pub lock_in_probability: f64,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            take_profit_pct: Decimal::from(30),
            stop_loss_pct: Decimal::from(-25),
            near_resolution_price: Decimal::new(90, 2), // 0.90
            lock_in_probability: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    CutLoss,
    NearResolution,
    LockInGains,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take profit",
            ExitReason::CutLoss => "cut loss",
            ExitReason::NearResolution => "near resolution",
            ExitReason::LockInGains => "lock in gains",
        }
    }

    /// Label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::CutLoss => "cut_loss",
            ExitReason::NearResolution => "near_resolution",
            ExitReason::LockInGains => "lock_in_gains",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether `position` should close this cycle.
///
/// Draws from `rng` only when the position is in profit and no deterministic
/// rule fired.
pub fn evaluate_exit(
    position: &Position,
    rules: &ExitRules,
    rng: &mut dyn RandomSource,
) -> Option<ExitReason> {
    let pnl_pct = position.pnl_percent();

    if pnl_pct >= rules.take_profit_pct {
        return Some(ExitReason::TakeProfit);
    }
    if pnl_pct <= rules.stop_loss_pct {
        return Some(ExitReason::CutLoss);
    }
    if position.current_price > rules.near_resolution_price {
        return Some(ExitReason::NearResolution);
    }
    if position.pnl() > Decimal::ZERO && rng.next_f64() < rules.lock_in_probability {
        return Some(ExitReason::LockInGains);
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
