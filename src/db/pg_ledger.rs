use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Account, NewTrade, Position, PositionKey, Thought, Trade};

use super::{account_repo, position_repo, thought_repo, trade_repo, LedgerStore};

/// Postgres-backed ledger.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    initial_balance: Decimal,
}

impl PgLedger {
    pub fn new(pool: PgPool, initial_balance: Decimal) -> Self {
        Self {
            pool,
            initial_balance,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn get_account(&self) -> Result<Account, StoreError> {
        account_repo::get_or_create_account(&self.pool, self.initial_balance).await
    }

    async fn set_balance(&self, balance: Decimal) -> Result<(), StoreError> {
        account_repo::update_balance(&self.pool, balance).await
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        position_repo::get_open_positions(&self.pool).await
    }

    async fn get_position(&self, key: &PositionKey) -> Result<Option<Position>, StoreError> {
        position_repo::get_position(&self.pool, key).await
    }

    async fn upsert_position(&self, position: &Position) -> Result<Position, StoreError> {
        position_repo::upsert_position(&self.pool, position).await
    }

    async fn delete_position(&self, key: &PositionKey) -> Result<(), StoreError> {
        position_repo::delete_position(&self.pool, key).await
    }

    async fn set_position_price(&self, key: &PositionKey, price: Decimal) -> Result<(), StoreError> {
        position_repo::update_position_price(&self.pool, key, price).await
    }

    async fn append_trade(&self, trade: NewTrade) -> Result<Trade, StoreError> {
        trade_repo::insert_trade(&self.pool, &trade).await
    }

    async fn list_trades(&self, limit: i64) -> Result<Vec<Trade>, StoreError> {
        trade_repo::get_recent_trades(&self.pool, limit).await
    }

    async fn all_trades(&self) -> Result<Vec<Trade>, StoreError> {
        trade_repo::get_all_trades(&self.pool).await
    }

    async fn append_thought(&self, trade_id: Uuid, content: &str) -> Result<Thought, StoreError> {
        thought_repo::insert_thought(&self.pool, trade_id, content).await
    }

    async fn list_thoughts(&self, limit: i64) -> Result<Vec<Thought>, StoreError> {
        thought_repo::get_recent_thoughts(&self.pool, limit).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
