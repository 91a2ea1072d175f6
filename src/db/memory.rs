use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Account, NewTrade, Position, PositionKey, Thought, Trade};

use super::LedgerStore;

#[derive(Debug, Default)]
struct Ledger {
    account: Option<Account>,
    // Insertion order; listings reverse it.
    positions: Vec<Position>,
    trades: Vec<Trade>,
    thoughts: Vec<Thought>,
}

/// In-process ledger. Used when no database is configured.
#[derive(Debug)]
pub struct MemoryLedger {
    initial_balance: Decimal,
    inner: RwLock<Ledger>,
}

impl MemoryLedger {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            inner: RwLock::new(Ledger::default()),
        }
    }
}

fn most_recent(len: usize, limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX).min(len)
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get_account(&self) -> Result<Account, StoreError> {
        let mut ledger = self.inner.write().await;
        let account = ledger
            .account
            .get_or_insert_with(|| Account::seeded(self.initial_balance));
        Ok(account.clone())
    }

    async fn set_balance(&self, balance: Decimal) -> Result<(), StoreError> {
        let mut ledger = self.inner.write().await;
        let account = ledger
            .account
            .get_or_insert_with(|| Account::seeded(self.initial_balance));
        account.balance = balance;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        let ledger = self.inner.read().await;
        Ok(ledger.positions.iter().rev().cloned().collect())
    }

    async fn get_position(&self, key: &PositionKey) -> Result<Option<Position>, StoreError> {
        let ledger = self.inner.read().await;
        Ok(ledger.positions.iter().find(|p| p.key() == *key).cloned())
    }

    async fn upsert_position(&self, position: &Position) -> Result<Position, StoreError> {
        let mut ledger = self.inner.write().await;
        let key = position.key();

        match ledger.positions.iter_mut().find(|p| p.key() == key) {
            Some(existing) => {
                existing.market_slug = position.market_slug.clone();
                existing.market_title = position.market_title.clone();
                existing.shares = position.shares;
                existing.entry_price = position.entry_price;
                existing.current_price = position.current_price;
                existing.invested = position.invested;
                existing.updated_at = Utc::now();
                Ok(existing.clone())
            }
            None => {
                ledger.positions.push(position.clone());
                Ok(position.clone())
            }
        }
    }

    async fn delete_position(&self, key: &PositionKey) -> Result<(), StoreError> {
        let mut ledger = self.inner.write().await;
        ledger.positions.retain(|p| p.key() != *key);
        Ok(())
    }

    async fn set_position_price(&self, key: &PositionKey, price: Decimal) -> Result<(), StoreError> {
        let mut ledger = self.inner.write().await;
        if let Some(position) = ledger.positions.iter_mut().find(|p| p.key() == *key) {
            position.current_price = price;
            position.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn append_trade(&self, trade: NewTrade) -> Result<Trade, StoreError> {
        let mut ledger = self.inner.write().await;
        let trade = trade.into_trade(Uuid::new_v4(), Utc::now());
        ledger.trades.push(trade.clone());
        Ok(trade)
    }

    async fn list_trades(&self, limit: i64) -> Result<Vec<Trade>, StoreError> {
        let ledger = self.inner.read().await;
        let n = most_recent(ledger.trades.len(), limit);
        Ok(ledger.trades.iter().rev().take(n).cloned().collect())
    }

    async fn all_trades(&self) -> Result<Vec<Trade>, StoreError> {
        let ledger = self.inner.read().await;
        Ok(ledger.trades.iter().rev().cloned().collect())
    }

    async fn append_thought(&self, trade_id: Uuid, content: &str) -> Result<Thought, StoreError> {
        let mut ledger = self.inner.write().await;
        let trade = ledger.trades.iter().find(|t| t.id == trade_id);

        let thought = Thought {
            id: Uuid::new_v4(),
            trade_id,
            content: content.to_string(),
            market_title: trade.map(|t| t.market_title.clone()),
            action: trade.map(|t| t.action.to_string()),
            outcome: trade.map(|t| t.outcome.clone()),
            created_at: Utc::now(),
        };
        ledger.thoughts.push(thought.clone());
        Ok(thought)
    }

    async fn list_thoughts(&self, limit: i64) -> Result<Vec<Thought>, StoreError> {
        let ledger = self.inner.read().await;
        let n = most_recent(ledger.thoughts.len(), limit);
        Ok(ledger.thoughts.iter().rev().take(n).cloned().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
