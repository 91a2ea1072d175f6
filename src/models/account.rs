use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The single simulated trading account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i32,
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub const SINGLETON_ID: i32 = 1;

    /// Fresh account seeded with `initial_balance`.
    pub fn seeded(initial_balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Self::SINGLETON_ID,
            balance: initial_balance,
            initial_balance,
            created_at: now,
            updated_at: now,
        }
    }
}
