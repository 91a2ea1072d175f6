use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Account, Position, Trade, TradeAction};

/// Aggregated account performance derived from the trade log and open positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub total_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_trades: i64,
    pub wins: i64,
    pub losses: i64,
    /// Percent, one decimal place.
    pub win_rate: Decimal,
    pub best_trade: Option<Trade>,
    pub worst_trade: Option<Trade>,
    pub active_positions: i64,
}

/// Compute all stats. Pure; tolerates an empty log and no positions.
pub fn compute_stats(account: &Account, trades: &[Trade], positions: &[Position]) -> Stats {
    let sells: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.action == TradeAction::Sell)
        .collect();

    let wins = sells.iter().filter(|t| t.pnl > Decimal::ZERO).count() as i64;
    let losses = sells.iter().filter(|t| t.pnl < Decimal::ZERO).count() as i64;

    Stats {
        balance: account.balance,
        initial_balance: account.initial_balance,
        total_pnl: realized_pnl(&sells),
        unrealized_pnl: unrealized_pnl(positions),
        total_trades: trades.len() as i64,
        wins,
        losses,
        win_rate: win_rate(wins, losses),
        best_trade: best_trade(&sells).cloned(),
        worst_trade: worst_trade(&sells).cloned(),
        active_positions: positions.len() as i64,
    }
}

// ---------------------------------------------------------------------------
// Realized / unrealized P&L
// ---------------------------------------------------------------------------

fn realized_pnl(sells: &[&Trade]) -> Decimal {
    sells.iter().map(|t| t.pnl).sum()
}

/// Mark-to-market P&L across open positions.
pub fn unrealized_pnl(positions: &[Position]) -> Decimal {
    positions.iter().map(Position::pnl).sum()
}

// ---------------------------------------------------------------------------
// Win rate
// ---------------------------------------------------------------------------

/// `wins / (wins + losses) * 100`; zero before any decided trade.
/// Break-even sells count toward neither side.
pub fn win_rate(wins: i64, losses: i64) -> Decimal {
    let decided = wins + losses;
    if decided == 0 {
        return Decimal::ZERO;
    }

    (Decimal::from(wins) / Decimal::from(decided) * Decimal::ONE_HUNDRED).round_dp(1)
}

// ---------------------------------------------------------------------------
// Best / worst
// ---------------------------------------------------------------------------

fn best_trade<'a>(sells: &[&'a Trade]) -> Option<&'a Trade> {
    sells.iter().copied().reduce(|best, t| if t.pnl > best.pnl { t } else { best })
}

fn worst_trade<'a>(sells: &[&'a Trade]) -> Option<&'a Trade> {
    sells.iter().copied().reduce(|worst, t| if t.pnl < worst.pnl { t } else { worst })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
