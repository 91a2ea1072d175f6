use rust_decimal::{Decimal, RoundingStrategy};

use super::entry_policy::EntryRules;

/// Map a uniform draw in `[0, 1)` onto the configured balance fraction range.
pub fn fraction_from_draw(draw: f64, rules: &EntryRules) -> Decimal {
    let unit = Decimal::try_from(draw.clamp(0.0, 1.0))
        .unwrap_or(Decimal::ZERO)
        .round_dp(6);
    rules.min_fraction + unit * (rules.max_fraction - rules.min_fraction)
}

/// Buy size for the current balance, truncated to cents.
///
/// `min(balance × fraction, max_position_size, balance − min_trade_size)`.
/// Returns `None` when that falls below the minimum trade size, which also
/// guarantees the balance never goes below `min_trade_size` after a buy.
pub fn calculate_size(balance: Decimal, fraction: Decimal, rules: &EntryRules) -> Option<Decimal> {
    let size = (balance * fraction)
        .min(rules.max_position_size)
        .min(balance - rules.min_trade_size)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);

    if size < rules.min_trade_size {
        return None;
    }

    Some(size)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
