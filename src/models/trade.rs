use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::TradeAction;

/// Database row for the trades table. Rows are never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub market_id: String,
    pub market_slug: String,
    pub market_title: String,
    pub outcome: String,
    #[sqlx(try_from = "String")]
    pub action: TradeAction,
    pub shares: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub pnl: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A trade about to be appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub market_id: String,
    pub market_slug: String,
    pub market_title: String,
    pub outcome: String,
    pub action: TradeAction,
    pub shares: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub pnl: Decimal,
}

impl NewTrade {
    pub fn into_trade(self, id: Uuid, created_at: DateTime<Utc>) -> Trade {
        Trade {
            id,
            market_id: self.market_id,
            market_slug: self.market_slug,
            market_title: self.market_title,
            outcome: self.outcome,
            action: self.action,
            shares: self.shares,
            price: self.price,
            total: self.total,
            pnl: self.pnl,
            created_at,
        }
    }
}
