use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Opportunity, Position, PositionKey};

/// Configurable limits for opening new positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRules {
    /// Max concurrent open positions (default 10).
    pub max_positions: usize,
    /// Smallest buy worth making, in USDC (default 30).
    pub min_trade_size: Decimal,
    /// Largest single buy, in USDC (default 200).
    pub max_position_size: Decimal,
    /// New trades attempted per cycle at most (default 2).
    pub max_new_trades_per_cycle: usize,
    /// Chance that a considered candidate is actually traded (default 40%).
    pub accept_probability: f64,
    /// Buy size as a fraction of balance is drawn from
    /// `[min_fraction, max_fraction)` (default 5%..15%).
    pub min_fraction: Decimal,
    pub max_fraction: Decimal,
}

impl Default for EntryRules {
    fn default() -> Self {
        Self {
            max_positions: 10,
            min_trade_size: Decimal::from(30),
            max_position_size: Decimal::from(200),
            max_new_trades_per_cycle: 2,
            accept_probability: 0.40,
            min_fraction: Decimal::new(5, 2),  // 0.05
            max_fraction: Decimal::new(15, 2), // 0.15
        }
    }
}

/// Why a cycle opened nothing new.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryHalt {
    #[error("max positions reached: {current}/{max}")]
    MaxPositions { current: usize, max: usize },

    #[error("low balance: {balance} < {required}")]
    LowBalance { balance: Decimal, required: Decimal },
}

/// Capacity and balance gates. Returns how many new trades may be attempted.
pub fn check_entry_gates(
    open_positions: usize,
    balance: Decimal,
    rules: &EntryRules,
) -> Result<usize, EntryHalt> {
    if open_positions >= rules.max_positions {
        return Err(EntryHalt::MaxPositions {
            current: open_positions,
            max: rules.max_positions,
        });
    }

    let required = rules.min_trade_size * Decimal::TWO;
    if balance < required {
        return Err(EntryHalt::LowBalance { balance, required });
    }

    Ok(rules
        .max_new_trades_per_cycle
        .min(rules.max_positions - open_positions))
}

/// Drop candidates for keys already held (and repeats within the list),
/// keep provider order, and take at most `slots`.
pub fn select_candidates(
    candidates: Vec<Opportunity>,
    open_positions: &[Position],
    slots: usize,
) -> Vec<Opportunity> {
    let mut seen: HashSet<PositionKey> = open_positions.iter().map(Position::key).collect();

    candidates
        .into_iter()
        .filter(|c| seen.insert(c.key()))
        .take(slots)
        .collect()
}

/// Stochastic gate that keeps trading infrequent.
pub fn accept_candidate(draw: f64, rules: &EntryRules) -> bool {
    draw < rules.accept_probability
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
