use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::LedgerStore;
use crate::errors::EngineError;
use crate::intelligence::{ReasoningContext, ReasoningGenerator, ReasoningRequest, Stats};
use crate::models::{NewTrade, Opportunity, Position, PositionKey, Trade, TradeAction};
use crate::polymarket::MarketDataProvider;

use super::entry_policy::{self, EntryHalt, EntryRules};
use super::exit_policy::{self, ExitReason, ExitRules};
use super::position_sizer;
use super::random::RandomSource;

/// Policy parameters for the trading engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub exit: ExitRules,
    pub entry: EntryRules,
}

/// A position closed during a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ExitRecord {
    pub market_id: String,
    pub outcome: String,
    pub market_title: String,
    pub reason: ExitReason,
    pub price: Decimal,
    pub shares: Decimal,
    pub proceeds: Decimal,
    pub pnl: Decimal,
    pub trade_id: Option<Uuid>,
}

/// A buy made during a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub market_id: String,
    pub outcome: String,
    pub market_title: String,
    pub price: Decimal,
    pub size: Decimal,
    pub shares: Decimal,
    pub balance_after: Decimal,
    pub trade_id: Option<Uuid>,
}

/// What one analysis cycle did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub prices_refreshed: usize,
    pub exits: Vec<ExitRecord>,
    pub entries: Vec<EntryRecord>,
    /// Set when the entry gates stopped the cycle from considering candidates.
    pub entry_halt: Option<EntryHalt>,
}

/// Decision engine over one simulated account.
///
/// Positions and candidates are processed strictly in sequence, and cycles
/// are serialized, so every step sees the balance left by the previous one.
pub struct TradingEngine {
    store: Arc<dyn LedgerStore>,
    market: Arc<dyn MarketDataProvider>,
    reasoner: Arc<dyn ReasoningGenerator>,
    rng: Mutex<Box<dyn RandomSource>>,
    config: EngineConfig,
    cycle_guard: Mutex<()>,
}

impl TradingEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        market: Arc<dyn MarketDataProvider>,
        reasoner: Arc<dyn ReasoningGenerator>,
        rng: Box<dyn RandomSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            market,
            reasoner,
            rng: Mutex::new(rng),
            config,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Price refresh, then exits, then entries.
    pub async fn run_analysis_cycle(&self) -> Result<CycleReport, EngineError> {
        let _guard = self.cycle_guard.lock().await;
        let started = Instant::now();
        counter!("analysis_cycles_total").increment(1);

        let result = self.cycle().await;
        histogram!("analysis_cycle_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                tracing::info!(
                    prices_refreshed = report.prices_refreshed,
                    exits = report.exits.len(),
                    entries = report.entries.len(),
                    halt = ?report.entry_halt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis cycle complete"
                );
            }
            Err(e) => {
                counter!("analysis_cycle_failures_total").increment(1);
                tracing::error!(error = %e, "Analysis cycle failed");
            }
        }

        result
    }

    async fn cycle(&self) -> Result<CycleReport, EngineError> {
        // Lazily creates the account on a fresh ledger
        self.store
            .get_account()
            .await
            .map_err(EngineError::AccountUnavailable)?;

        let mut report = CycleReport {
            prices_refreshed: self.refresh_prices().await,
            ..Default::default()
        };
        report.exits = self.check_exits().await;

        match self.find_new_trades().await {
            Ok(entries) => report.entries = entries,
            Err(halt) => {
                tracing::info!(reason = %halt, "No new trades this cycle");
                report.entry_halt = Some(halt);
            }
        }

        self.record_gauges().await;
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Price refresh
    // -----------------------------------------------------------------------

    /// Write fresh marks for held positions. Returns how many were updated.
    /// Positions without a quote keep their last price.
    pub async fn refresh_prices(&self) -> usize {
        let positions = match self.store.list_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load positions for price refresh");
                return 0;
            }
        };
        if positions.is_empty() {
            return 0;
        }

        let updates = match self.market.refresh_prices(&positions).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "Price refresh unavailable, keeping stale prices");
                return 0;
            }
        };

        let mut refreshed = 0;
        for update in updates {
            let key = PositionKey::new(&update.market_id, &update.outcome);
            if !positions.iter().any(|p| p.key() == key) {
                continue;
            }
            if !is_quotable(update.price) {
                tracing::warn!(position = %key, price = %update.price, "Ignoring out-of-range price quote");
                continue;
            }

            match self.store.set_position_price(&key, update.price).await {
                Ok(()) => refreshed += 1,
                Err(e) => {
                    tracing::error!(error = %e, position = %key, "Failed to store refreshed price");
                }
            }
        }

        tracing::debug!(held = positions.len(), refreshed, "Prices refreshed");
        refreshed
    }

    // -----------------------------------------------------------------------
    // Exits
    // -----------------------------------------------------------------------

    /// Evaluate every open position against the exit rules and close the matches.
    pub async fn check_exits(&self) -> Vec<ExitRecord> {
        let positions = match self.store.list_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load positions for exit check");
                return Vec::new();
            }
        };

        let mut exits = Vec::new();
        for position in positions {
            let reason = {
                let mut rng = self.rng.lock().await;
                exit_policy::evaluate_exit(&position, &self.config.exit, &mut **rng)
            };
            let Some(reason) = reason else {
                continue;
            };

            if let Some(record) = self.execute_sell(&position, reason).await {
                exits.push(record);
            }
        }

        exits
    }

    /// Close `position` in full at its current mark.
    ///
    /// Writes are attempted once each, in order: balance, trade, thought,
    /// position removal. A failed balance write abandons the close before
    /// anything is committed; later failures are logged and left in place.
    pub async fn execute_sell(&self, position: &Position, reason: ExitReason) -> Option<ExitRecord> {
        let key = position.key();
        let proceeds = position.current_value();
        let pnl = position.pnl();

        let account = match self.store.get_account().await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(error = %e, position = %key, "Failed to load account for sell");
                return None;
            }
        };

        if let Err(e) = self.store.set_balance(account.balance + proceeds).await {
            tracing::error!(error = %e, position = %key, "Failed to credit sale proceeds");
            return None;
        }

        let trade = self
            .record_trade(NewTrade {
                market_id: position.market_id.clone(),
                market_slug: position.market_slug.clone(),
                market_title: position.market_title.clone(),
                outcome: position.outcome.clone(),
                action: TradeAction::Sell,
                shares: position.shares,
                price: position.current_price,
                total: proceeds,
                pnl,
            })
            .await;

        tracing::info!(
            market = %position.market_title,
            outcome = %position.outcome,
            price = %position.current_price,
            shares = %position.shares,
            pnl = %pnl,
            reason = %reason,
            "SELL"
        );
        counter!("positions_closed_total", "reason" => reason.metric_label()).increment(1);

        if let Some(trade) = &trade {
            let context = ReasoningContext {
                stats: self.current_stats().await,
                realized_pnl: Some(pnl),
                exit_reason: Some(reason.as_str().to_string()),
                ..Default::default()
            };
            self.record_thought(trade, context).await;
        }

        if let Err(e) = self.store.delete_position(&key).await {
            tracing::error!(error = %e, position = %key, "Failed to remove closed position");
        }

        Some(ExitRecord {
            market_id: position.market_id.clone(),
            outcome: position.outcome.clone(),
            market_title: position.market_title.clone(),
            reason,
            price: position.current_price,
            shares: position.shares,
            proceeds,
            pnl,
            trade_id: trade.map(|t| t.id),
        })
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// Gate, select and buy new candidates.
    pub async fn find_new_trades(&self) -> Result<Vec<EntryRecord>, EntryHalt> {
        let rules = &self.config.entry;

        let positions = match self.store.list_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load positions for entry check");
                return Ok(Vec::new());
            }
        };
        let account = match self.store.get_account().await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load account for entry check");
                return Ok(Vec::new());
            }
        };

        let slots = entry_policy::check_entry_gates(positions.len(), account.balance, rules)?;

        let mut candidates = self.fetch_opportunities(true).await;
        candidates.extend(self.fetch_opportunities(false).await);
        let candidates = entry_policy::select_candidates(candidates, &positions, slots);

        tracing::debug!(slots, candidates = candidates.len(), "Considering new trades");

        let mut entries = Vec::new();
        for candidate in candidates {
            let fraction = {
                let mut rng = self.rng.lock().await;
                if entry_policy::accept_candidate(rng.next_f64(), rules) {
                    Some(position_sizer::fraction_from_draw(rng.next_f64(), rules))
                } else {
                    None
                }
            };
            let Some(fraction) = fraction else {
                tracing::debug!(position = %candidate.key(), "Candidate skipped");
                continue;
            };

            if let Some(record) = self.execute_buy(&candidate, fraction).await {
                let balance_after = record.balance_after;
                entries.push(record);
                if balance_after < rules.min_trade_size {
                    break;
                }
            }
        }

        Ok(entries)
    }

    async fn fetch_opportunities(&self, trending: bool) -> Vec<Opportunity> {
        let result = if trending {
            self.market.trending_opportunities().await
        } else {
            self.market.new_opportunities().await
        };

        let mut opportunities = result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, trending, "Opportunity listing unavailable");
            Vec::new()
        });
        opportunities.retain(|o| {
            let usable = is_quotable(o.price);
            if !usable {
                tracing::warn!(position = %o.key(), price = %o.price, "Dropping candidate with out-of-range price");
            }
            usable
        });
        opportunities
    }

    /// Buy `opportunity` with `fraction` of the current balance.
    ///
    /// Returns `None` when the sized buy falls under the minimum or the
    /// balance could not be read or debited.
    pub async fn execute_buy(&self, opportunity: &Opportunity, fraction: Decimal) -> Option<EntryRecord> {
        let rules = &self.config.entry;
        let key = opportunity.key();

        if !is_quotable(opportunity.price) {
            tracing::warn!(position = %key, price = %opportunity.price, "Ignoring candidate without a usable price");
            return None;
        }

        let account = match self.store.get_account().await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(error = %e, position = %key, "Failed to load account for buy");
                return None;
            }
        };

        let Some(size) = position_sizer::calculate_size(account.balance, fraction, rules) else {
            tracing::debug!(position = %key, balance = %account.balance, "Buy below minimum size, skipping");
            return None;
        };
        let Some(shares) = size.checked_div(opportunity.price) else {
            tracing::warn!(position = %key, price = %opportunity.price, size = %size, "Share count overflows, skipping");
            return None;
        };
        let balance_after = account.balance - size;

        if let Err(e) = self.store.set_balance(balance_after).await {
            tracing::error!(error = %e, position = %key, "Failed to debit buy");
            return None;
        }

        let trade = self
            .record_trade(NewTrade {
                market_id: opportunity.market_id.clone(),
                market_slug: opportunity.market_slug.clone(),
                market_title: opportunity.market_title.clone(),
                outcome: opportunity.outcome.clone(),
                action: TradeAction::Buy,
                shares,
                price: opportunity.price,
                total: size,
                pnl: Decimal::ZERO,
            })
            .await;

        let position = match self.store.get_position(&key).await {
            Ok(Some(mut existing)) => {
                existing.add_fill(shares, opportunity.price, size);
                existing
            }
            Ok(None) => self.opened_position(opportunity, shares, size),
            Err(e) => {
                tracing::error!(error = %e, position = %key, "Failed to look up existing position");
                self.opened_position(opportunity, shares, size)
            }
        };
        if let Err(e) = self.store.upsert_position(&position).await {
            tracing::error!(error = %e, position = %key, "Failed to store position");
        }

        tracing::info!(
            market = %opportunity.market_title,
            outcome = %opportunity.outcome,
            price = %opportunity.price,
            size = %size,
            shares = %shares,
            "BUY"
        );
        counter!("positions_opened_total").increment(1);

        if let Some(trade) = &trade {
            let context = ReasoningContext {
                stats: self.current_stats().await,
                entry_reasons: opportunity.reasons.clone(),
                ..Default::default()
            };
            self.record_thought(trade, context).await;
        }

        Some(EntryRecord {
            market_id: opportunity.market_id.clone(),
            outcome: opportunity.outcome.clone(),
            market_title: opportunity.market_title.clone(),
            price: opportunity.price,
            size,
            shares,
            balance_after,
            trade_id: trade.map(|t| t.id),
        })
    }

    fn opened_position(&self, opportunity: &Opportunity, shares: Decimal, size: Decimal) -> Position {
        Position::opened(
            &opportunity.market_id,
            &opportunity.market_slug,
            &opportunity.market_title,
            &opportunity.outcome,
            shares,
            opportunity.price,
            size,
        )
    }

    // -----------------------------------------------------------------------
    // Log helpers
    // -----------------------------------------------------------------------

    async fn record_trade(&self, trade: NewTrade) -> Option<Trade> {
        match self.store.append_trade(trade).await {
            Ok(trade) => Some(trade),
            Err(e) => {
                tracing::error!(error = %e, "Failed to append trade");
                None
            }
        }
    }

    async fn record_thought(&self, trade: &Trade, context: ReasoningContext) {
        let request = ReasoningRequest {
            action: trade.action,
            market_title: trade.market_title.clone(),
            outcome: trade.outcome.clone(),
            price: trade.price,
            context,
        };

        let Some(text) = self.reasoner.explain(&request).await else {
            tracing::debug!(trade_id = %trade.id, "No reasoning produced");
            return;
        };
        if text.trim().is_empty() {
            return;
        }

        if let Err(e) = self.store.append_thought(trade.id, &text).await {
            tracing::error!(error = %e, trade_id = %trade.id, "Failed to append thought");
        }
    }

    async fn current_stats(&self) -> Option<Stats> {
        match self.store.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(error = %e, "Stats unavailable for reasoning");
                None
            }
        }
    }

    async fn record_gauges(&self) {
        if let Ok(positions) = self.store.list_positions().await {
            gauge!("open_positions").set(positions.len() as f64);
        }
        if let Ok(account) = self.store.get_account().await {
            gauge!("account_balance").set(account.balance.to_f64().unwrap_or(0.0));
        }
    }
}

/// Outcome prices are probabilities: strictly positive and at most 1.
fn is_quotable(price: Decimal) -> bool {
    price > Decimal::ZERO && price <= Decimal::ONE
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
