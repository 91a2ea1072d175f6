use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Reasoning note attached to one trade. Market, action and outcome are a
/// snapshot of the trade taken at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Thought {
    pub id: Uuid,
    pub trade_id: Uuid,
    pub content: String,
    pub market_title: Option<String>,
    pub action: Option<String>,
    pub outcome: Option<String>,
    pub created_at: DateTime<Utc>,
}
