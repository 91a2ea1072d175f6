use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use clobster::db::{LedgerStore, MemoryLedger};
use clobster::errors::{ProviderError, StoreError};
use clobster::execution::{EngineConfig, SequenceRandom, TradingEngine};
use clobster::intelligence::{ReasoningGenerator, ReasoningRequest};
use clobster::models::{
    Account, NewTrade, Opportunity, Position, PositionKey, PriceUpdate, Thought, Trade,
};

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Connect to `TEST_DATABASE_URL`, run migrations and empty the ledger tables.
/// Returns `None` when no test database is configured.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean tables for test isolation
    sqlx::query("DELETE FROM thoughts").execute(&pool).await.ok();
    sqlx::query("DELETE FROM trades").execute(&pool).await.ok();
    sqlx::query("DELETE FROM positions").execute(&pool).await.ok();
    sqlx::query("DELETE FROM account").execute(&pool).await.ok();

    Some(pool)
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Scripted market data. Returns the same lists every call.
#[derive(Debug, Default, Clone)]
pub struct StubMarket {
    pub prices: Vec<PriceUpdate>,
    pub trending: Vec<Opportunity>,
    pub new: Vec<Opportunity>,
    pub fail: bool,
}

#[allow(dead_code)]
impl StubMarket {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_price(mut self, market_id: &str, outcome: &str, price: Decimal) -> Self {
        self.prices.push(PriceUpdate {
            market_id: market_id.into(),
            outcome: outcome.into(),
            price,
        });
        self
    }

    pub fn with_trending(mut self, opportunities: Vec<Opportunity>) -> Self {
        self.trending = opportunities;
        self
    }

    pub fn with_new(mut self, opportunities: Vec<Opportunity>) -> Self {
        self.new = opportunities;
        self
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.fail {
            return Err(ProviderError::Unavailable("stub outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl clobster::polymarket::MarketDataProvider for StubMarket {
    async fn refresh_prices(&self, _positions: &[Position]) -> Result<Vec<PriceUpdate>, ProviderError> {
        self.check()?;
        Ok(self.prices.clone())
    }

    async fn trending_opportunities(&self) -> Result<Vec<Opportunity>, ProviderError> {
        self.check()?;
        Ok(self.trending.clone())
    }

    async fn new_opportunities(&self) -> Result<Vec<Opportunity>, ProviderError> {
        self.check()?;
        Ok(self.new.clone())
    }
}

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

/// Records every request; answers with a fixed line, or nothing when silent.
#[derive(Debug, Default)]
pub struct RecordingReasoner {
    pub requests: Mutex<Vec<ReasoningRequest>>,
    pub silent: bool,
}

#[allow(dead_code)]
impl RecordingReasoner {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Default::default()
        }
    }

    pub fn recorded(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningGenerator for RecordingReasoner {
    async fn explain(&self, request: &ReasoningRequest) -> Option<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.silent {
            return None;
        }
        Some(format!("{} {} on {}", request.action, request.outcome, request.market_title))
    }
}

// ---------------------------------------------------------------------------
// Failure-injecting ledger
// ---------------------------------------------------------------------------

/// `MemoryLedger` whose individual operations can be switched to fail.
#[derive(Debug)]
pub struct FlakyLedger {
    pub inner: MemoryLedger,
    pub fail_get_account: AtomicBool,
    pub fail_set_balance: AtomicBool,
    pub fail_append_trade: AtomicBool,
}

#[allow(dead_code)]
impl FlakyLedger {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            inner: MemoryLedger::new(initial_balance),
            fail_get_account: AtomicBool::new(false),
            fail_set_balance: AtomicBool::new(false),
            fail_append_trade: AtomicBool::new(false),
        }
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn get_account(&self) -> Result<Account, StoreError> {
        Self::check(&self.fail_get_account, "get_account")?;
        self.inner.get_account().await
    }

    async fn set_balance(&self, balance: Decimal) -> Result<(), StoreError> {
        Self::check(&self.fail_set_balance, "set_balance")?;
        self.inner.set_balance(balance).await
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        self.inner.list_positions().await
    }

    async fn get_position(&self, key: &PositionKey) -> Result<Option<Position>, StoreError> {
        self.inner.get_position(key).await
    }

    async fn upsert_position(&self, position: &Position) -> Result<Position, StoreError> {
        self.inner.upsert_position(position).await
    }

    async fn delete_position(&self, key: &PositionKey) -> Result<(), StoreError> {
        self.inner.delete_position(key).await
    }

    async fn set_position_price(&self, key: &PositionKey, price: Decimal) -> Result<(), StoreError> {
        self.inner.set_position_price(key, price).await
    }

    async fn append_trade(&self, trade: NewTrade) -> Result<Trade, StoreError> {
        Self::check(&self.fail_append_trade, "append_trade")?;
        self.inner.append_trade(trade).await
    }

    async fn list_trades(&self, limit: i64) -> Result<Vec<Trade>, StoreError> {
        self.inner.list_trades(limit).await
    }

    async fn all_trades(&self) -> Result<Vec<Trade>, StoreError> {
        self.inner.all_trades().await
    }

    async fn append_thought(&self, trade_id: Uuid, content: &str) -> Result<Thought, StoreError> {
        self.inner.append_thought(trade_id, content).await
    }

    async fn list_thoughts(&self, limit: i64) -> Result<Vec<Thought>, StoreError> {
        self.inner.list_thoughts(limit).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Self::check(&self.fail_get_account, "ping")
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

#[allow(dead_code)]
pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

#[allow(dead_code)]
pub fn opportunity(market_id: &str, outcome: &str, price: Decimal) -> Opportunity {
    Opportunity {
        market_id: market_id.into(),
        market_slug: format!("{market_id}-slug"),
        market_title: format!("Will {market_id} happen?"),
        outcome: outcome.into(),
        price,
        reasons: vec!["high 24h volume ($25000)".into()],
    }
}

/// 100 shares of `market_id`/Yes bought for `invested`, marked at the entry price.
#[allow(dead_code)]
pub async fn seed_position(store: &dyn LedgerStore, market_id: &str, invested: Decimal) -> Position {
    let shares = Decimal::from(100);
    let position = Position::opened(
        market_id,
        &format!("{market_id}-slug"),
        &format!("Will {market_id} happen?"),
        "Yes",
        shares,
        invested / shares,
        invested,
    );
    store.upsert_position(&position).await.unwrap()
}

#[allow(dead_code)]
pub fn build_engine(
    store: Arc<dyn LedgerStore>,
    market: StubMarket,
    reasoner: Arc<dyn ReasoningGenerator>,
    draws: Vec<f64>,
) -> TradingEngine {
    TradingEngine::new(
        store,
        Arc::new(market),
        reasoner,
        Box::new(SequenceRandom::new(draws)),
        EngineConfig::default(),
    )
}
