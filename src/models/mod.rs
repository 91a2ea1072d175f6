pub mod account;
pub mod market;
pub mod position;
pub mod thought;
pub mod trade;

pub use account::Account;
pub use market::{Opportunity, PriceUpdate};
pub use position::{Position, PositionKey, PositionView};
pub use thought::Thought;
pub use trade::{NewTrade, Trade};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TradeAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" => Some(TradeAction::Buy),
            "SELL" => Some(TradeAction::Sell),
            _ => None,
        }
    }
}

impl TryFrom<String> for TradeAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TradeAction::from_db_str(&value).ok_or_else(|| format!("unknown trade action: {value}"))
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
