use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PositionKey;

/// A refreshed price for one held `(market_id, outcome)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub market_id: String,
    pub outcome: String,
    pub price: Decimal,
}

/// A candidate market outcome surfaced by the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub market_id: String,
    pub market_slug: String,
    pub market_title: String,
    pub outcome: String,
    pub price: Decimal,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Opportunity {
    pub fn key(&self) -> PositionKey {
        PositionKey::new(&self.market_id, &self.outcome)
    }
}
