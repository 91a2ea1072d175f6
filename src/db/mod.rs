pub mod account_repo;
pub mod memory;
pub mod pg_ledger;
pub mod position_repo;
pub mod thought_repo;
pub mod trade_repo;

pub use memory::MemoryLedger;
pub use pg_ledger::PgLedger;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::intelligence::stats::{compute_stats, Stats};
use crate::models::{Account, NewTrade, Position, PositionKey, Thought, Trade};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Durable state of the simulated account: the account row, open positions,
/// and the append-only trade and thought logs.
///
/// Everything except `append_trade` / `append_thought` is safe to retry.
/// Those two create a new identity on every call.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the account, creating it with the configured initial balance if absent.
    async fn get_account(&self) -> Result<Account, StoreError>;

    async fn set_balance(&self, balance: Decimal) -> Result<(), StoreError>;

    /// Open positions, most recently opened first.
    async fn list_positions(&self) -> Result<Vec<Position>, StoreError>;

    async fn get_position(&self, key: &PositionKey) -> Result<Option<Position>, StoreError>;

    /// Insert by key, or overwrite the stored row for an existing key.
    async fn upsert_position(&self, position: &Position) -> Result<Position, StoreError>;

    async fn delete_position(&self, key: &PositionKey) -> Result<(), StoreError>;

    async fn set_position_price(&self, key: &PositionKey, price: Decimal) -> Result<(), StoreError>;

    async fn append_trade(&self, trade: NewTrade) -> Result<Trade, StoreError>;

    /// Most recent trades first.
    async fn list_trades(&self, limit: i64) -> Result<Vec<Trade>, StoreError>;

    /// The full trade log, most recent first.
    async fn all_trades(&self) -> Result<Vec<Trade>, StoreError>;

    /// Attach a reasoning note to a trade, snapshotting the trade's market/action/outcome.
    async fn append_thought(&self, trade_id: Uuid, content: &str) -> Result<Thought, StoreError>;

    /// Most recent thoughts first.
    async fn list_thoughts(&self, limit: i64) -> Result<Vec<Thought>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<Stats, StoreError> {
        let account = self.get_account().await?;
        let positions = self.list_positions().await?;
        let trades = self.all_trades().await?;
        Ok(compute_stats(&account, &trades, &positions))
    }
}
