use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Natural key of a position. At most one open position exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub market_id: String,
    pub outcome: String,
}

impl PositionKey {
    pub fn new(market_id: &str, outcome: &str) -> Self {
        Self {
            market_id: market_id.to_string(),
            outcome: outcome.to_string(),
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.market_id, self.outcome)
    }
}

/// Database row for positions table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub market_id: String,
    pub market_slug: String,
    pub market_title: String,
    pub outcome: String,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub invested: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// New position opened by a single fill.
    pub fn opened(
        market_id: &str,
        market_slug: &str,
        market_title: &str,
        outcome: &str,
        shares: Decimal,
        price: Decimal,
        invested: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            market_id: market_id.to_string(),
            market_slug: market_slug.to_string(),
            market_title: market_title.to_string(),
            outcome: outcome.to_string(),
            shares,
            entry_price: price,
            current_price: price,
            invested,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(&self.market_id, &self.outcome)
    }

    pub fn current_value(&self) -> Decimal {
        self.shares * self.current_price
    }

    pub fn pnl(&self) -> Decimal {
        self.current_value() - self.invested
    }

    /// P&L relative to cost basis, in percent. Zero when nothing is invested.
    pub fn pnl_percent(&self) -> Decimal {
        if self.invested.is_zero() {
            return Decimal::ZERO;
        }
        self.pnl() / self.invested * Decimal::ONE_HUNDRED
    }

    /// Fold another fill on the same key into this position.
    ///
    /// Shares and cost basis accumulate; the entry price becomes the
    /// cost-weighted average and the mark moves to the fill price.
    pub fn add_fill(&mut self, shares: Decimal, price: Decimal, invested: Decimal) {
        self.shares += shares;
        self.invested += invested;
        if !self.shares.is_zero() {
            self.entry_price = self.invested / self.shares;
        }
        self.current_price = price;
        self.updated_at = Utc::now();
    }
}

/// Position with derived mark-to-market fields, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub current_value: Decimal,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
}

impl From<Position> for PositionView {
    fn from(position: Position) -> Self {
        let current_value = position.current_value();
        let pnl = position.pnl();
        let pnl_percent = position.pnl_percent().round_dp(2);
        Self {
            position,
            current_value,
            pnl,
            pnl_percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
