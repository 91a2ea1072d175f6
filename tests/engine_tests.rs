mod common;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rust_decimal::Decimal;

use clobster::db::{LedgerStore, MemoryLedger};
use clobster::errors::EngineError;
use clobster::execution::{
    EngineConfig, EntryHalt, ExitReason, StdRandom, TradingEngine,
};
use clobster::intelligence::TemplateReasoner;
use clobster::models::{PositionKey, TradeAction};
use clobster::services::build_dashboard_snapshot;

use common::{build_engine, dec, opportunity, seed_position, FlakyLedger, RecordingReasoner, StubMarket};

fn memory(initial: i64) -> Arc<MemoryLedger> {
    Arc::new(MemoryLedger::new(Decimal::from(initial)))
}

// ---------------------------------------------------------------------------
// Balance conservation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_buy_conserves_balance() {
    let store = memory(1_500);
    let market = StubMarket::default().with_trending(vec![opportunity("m1", "Yes", dec("0.40"))]);
    // accept, then fraction 10%
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.1, 0.5]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.size, Decimal::from(150));
    assert_eq!(entry.shares, Decimal::from(375));

    let account = store.get_account().await.unwrap();
    assert_eq!(account.balance, Decimal::from(1_350));

    let position = store
        .get_position(&PositionKey::new("m1", "Yes"))
        .await
        .unwrap()
        .expect("position opened");
    assert_eq!(position.invested, entry.size);
    assert_eq!(position.shares, entry.size / dec("0.40"));
    assert_eq!(position.entry_price, dec("0.40"));
    assert_eq!(position.current_price, dec("0.40"));

    let trades = store.list_trades(10).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].action, TradeAction::Buy);
    assert_eq!(trades[0].total, Decimal::from(150));
    assert_eq!(trades[0].pnl, Decimal::ZERO);
}

#[tokio::test]
async fn test_sell_conserves_balance() {
    let store = memory(1_000);
    seed_position(&*store, "m1", Decimal::from(50)).await;
    // 0.50 → 0.35 is -30%
    let market = StubMarket::default().with_price("m1", "Yes", dec("0.35"));
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].reason, ExitReason::CutLoss);

    let account = store.get_account().await.unwrap();
    assert_eq!(account.balance, Decimal::from(1_035));
    assert!(store.list_positions().await.unwrap().is_empty());

    let trades = store.list_trades(10).await.unwrap();
    assert_eq!(trades[0].action, TradeAction::Sell);
    assert_eq!(trades[0].total, Decimal::from(35));
    assert_eq!(trades[0].pnl, Decimal::from(-15));
}

#[tokio::test]
async fn test_multiple_sells_accumulate_balance() {
    let store = memory(1_000);
    seed_position(&*store, "tp", Decimal::from(50)).await;
    seed_position(&*store, "sl", Decimal::from(100)).await;
    seed_position(&*store, "nr", Decimal::from(100)).await;

    let market = StubMarket::default()
        // +30.0% exactly
        .with_price("tp", "Yes", dec("0.65"))
        // -25.0% exactly
        .with_price("sl", "Yes", dec("0.75"))
        // above 0.90 while still at a loss
        .with_price("nr", "Yes", dec("0.91"));
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![]);

    let report = engine.run_analysis_cycle().await.unwrap();
    assert_eq!(report.prices_refreshed, 3);

    let reasons: HashMap<String, ExitReason> = report
        .exits
        .iter()
        .map(|e| (e.market_id.clone(), e.reason))
        .collect();
    assert_eq!(reasons["tp"], ExitReason::TakeProfit);
    assert_eq!(reasons["sl"], ExitReason::CutLoss);
    assert_eq!(reasons["nr"], ExitReason::NearResolution);

    // 1000 + 65 + 75 + 91
    let account = store.get_account().await.unwrap();
    assert_eq!(account.balance, Decimal::from(1_231));
    assert_eq!(store.list_trades(10).await.unwrap().len(), 3);
    assert_eq!(store.list_thoughts(10).await.unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Exit rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_lock_in_gains_follows_draw() {
    let store = memory(1_000);
    seed_position(&*store, "up", Decimal::from(50)).await;
    let market = StubMarket::default().with_price("up", "Yes", dec("0.55"));

    // 0.5 misses the 5% lock-in chance
    let engine = build_engine(store.clone(), market.clone(), Arc::new(TemplateReasoner), vec![0.5]);
    let report = engine.run_analysis_cycle().await.unwrap();
    assert!(report.exits.is_empty());
    assert_eq!(store.list_positions().await.unwrap().len(), 1);

    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.01]);
    let report = engine.run_analysis_cycle().await.unwrap();
    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].reason, ExitReason::LockInGains);
    assert_eq!(report.exits[0].pnl, Decimal::from(5));
}

#[tokio::test]
async fn test_losing_position_never_draws() {
    let store = memory(1_000);
    seed_position(&*store, "down", Decimal::from(50)).await;
    let market = StubMarket::default().with_price("down", "Yes", dec("0.45"));

    // A draw of 0.0 would lock in if it were consumed
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0]);
    let report = engine.run_analysis_cycle().await.unwrap();

    assert!(report.exits.is_empty());
    assert_eq!(store.list_positions().await.unwrap()[0].current_price, dec("0.45"));
}

// ---------------------------------------------------------------------------
// Entry capacity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_no_entries_at_max_positions() {
    let store = memory(1_500);
    for i in 0..10 {
        seed_position(&*store, &format!("held{i}"), Decimal::from(50)).await;
    }
    let market = StubMarket::default().with_trending(vec![opportunity("fresh", "Yes", dec("0.40"))]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.0]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert!(report.entries.is_empty());
    assert_eq!(
        report.entry_halt,
        Some(EntryHalt::MaxPositions { current: 10, max: 10 })
    );
    assert_eq!(store.list_positions().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_one_slot_left_allows_one_trade() {
    let store = memory(1_500);
    for i in 0..9 {
        seed_position(&*store, &format!("held{i}"), Decimal::from(50)).await;
    }
    let market = StubMarket::default().with_trending(vec![
        opportunity("a", "Yes", dec("0.40")),
        opportunity("b", "Yes", dec("0.40")),
        opportunity("c", "Yes", dec("0.40")),
    ]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0; 6]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].market_id, "a");
    assert_eq!(store.list_positions().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_at_most_two_trades_per_cycle() {
    let store = memory(1_500);
    let candidates = (0..5)
        .map(|i| opportunity(&format!("m{i}"), "Yes", dec("0.50")))
        .collect();
    let market = StubMarket::default().with_trending(candidates);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.5, 0.0, 0.5, 0.0, 0.5]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.entries.len(), 2);
    // Second buy sizes off the balance left by the first
    assert_eq!(report.entries[0].size, Decimal::from(150));
    assert_eq!(report.entries[1].size, Decimal::from(135));
    assert_eq!(store.get_account().await.unwrap().balance, Decimal::from(1_215));
}

#[tokio::test]
async fn test_low_balance_halts_entries() {
    let store = memory(59);
    let market = StubMarket::default().with_trending(vec![opportunity("a", "Yes", dec("0.40"))]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.0]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert!(report.entries.is_empty());
    assert!(matches!(report.entry_halt, Some(EntryHalt::LowBalance { .. })));
    assert!(store.list_trades(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undersized_buy_is_skipped() {
    // 5% of 300 is 15, under the 30 minimum
    let store = memory(300);
    let market = StubMarket::default().with_trending(vec![opportunity("a", "Yes", dec("0.40"))]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.0]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert!(report.entries.is_empty());
    assert!(report.entry_halt.is_none());
    assert_eq!(store.get_account().await.unwrap().balance, Decimal::from(300));
}

#[tokio::test]
async fn test_candidates_for_held_keys_are_excluded() {
    let store = memory(1_500);
    seed_position(&*store, "a", Decimal::from(50)).await;
    let market = StubMarket::default()
        .with_trending(vec![opportunity("a", "Yes", dec("0.40"))])
        .with_new(vec![opportunity("a", "No", dec("0.60")), opportunity("a", "No", dec("0.60"))]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.0, 0.0, 0.0]);

    let report = engine.run_analysis_cycle().await.unwrap();

    // Held a/Yes skipped, duplicate a/No collapsed
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].outcome, "No");

    let keys: Vec<PositionKey> = store.list_positions().await.unwrap().iter().map(|p| p.key()).collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&PositionKey::new("a", "Yes")));
    assert!(keys.contains(&PositionKey::new("a", "No")));
}

#[tokio::test]
async fn test_rebuy_averages_entry_price() {
    let store = memory(1_500);
    let engine = build_engine(store.clone(), StubMarket::default(), Arc::new(TemplateReasoner), vec![]);

    // 150 at 0.40, then 135 at 0.60
    engine.execute_buy(&opportunity("a", "Yes", dec("0.40")), dec("0.10")).await.unwrap();
    engine.execute_buy(&opportunity("a", "Yes", dec("0.60")), dec("0.10")).await.unwrap();

    let positions = store.list_positions().await.unwrap();
    assert_eq!(positions.len(), 1);

    let p = &positions[0];
    assert_eq!(p.invested, Decimal::from(285));
    assert_eq!(p.shares, Decimal::from(600));
    assert_eq!(p.entry_price, dec("0.475"));
    assert_eq!(p.current_price, dec("0.60"));
}

#[tokio::test]
async fn test_positions_stay_unique_across_cycles() {
    let store = memory(5_000);
    let candidates = vec![
        opportunity("a", "Yes", dec("0.30")),
        opportunity("a", "No", dec("0.70")),
        opportunity("b", "Yes", dec("0.45")),
        opportunity("c", "Yes", dec("0.20")),
    ];
    let market = StubMarket::default()
        .with_trending(candidates.clone())
        .with_new(candidates);
    let engine = TradingEngine::new(
        store.clone(),
        Arc::new(market),
        Arc::new(TemplateReasoner),
        Box::new(StdRandom::seeded(42)),
        EngineConfig::default(),
    );

    for _ in 0..20 {
        engine.run_analysis_cycle().await.unwrap();
    }

    let positions = store.list_positions().await.unwrap();
    let keys: HashSet<PositionKey> = positions.iter().map(|p| p.key()).collect();
    assert_eq!(keys.len(), positions.len());
    assert!(store.get_account().await.unwrap().balance >= Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Degraded collaborators
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_empty_state_cycle() {
    let store = memory(1_500);
    let engine = build_engine(store.clone(), StubMarket::default(), Arc::new(TemplateReasoner), vec![]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.prices_refreshed, 0);
    assert!(report.exits.is_empty());
    assert!(report.entries.is_empty());
    assert_eq!(store.get_account().await.unwrap().balance, Decimal::from(1_500));
}

#[tokio::test]
async fn test_provider_outage_is_not_fatal() {
    let store = memory(1_500);
    seed_position(&*store, "a", Decimal::from(50)).await;
    let engine = build_engine(store.clone(), StubMarket::failing(), Arc::new(TemplateReasoner), vec![]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.prices_refreshed, 0);
    assert!(report.entries.is_empty());
    assert_eq!(store.list_positions().await.unwrap()[0].current_price, dec("0.50"));
}

#[tokio::test]
async fn test_missing_quote_keeps_stale_price() {
    let store = memory(1_500);
    seed_position(&*store, "a", Decimal::from(50)).await;
    seed_position(&*store, "b", Decimal::from(50)).await;
    let market = StubMarket::default()
        .with_price("a", "Yes", dec("0.52"))
        // Not held; ignored
        .with_price("zzz", "Yes", dec("0.10"));
    // 0.52 is +4%; 0.5 skips the lock-in draw
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.5]);

    let report = engine.run_analysis_cycle().await.unwrap();
    assert_eq!(report.prices_refreshed, 1);

    let a = store.get_position(&PositionKey::new("a", "Yes")).await.unwrap().unwrap();
    let b = store.get_position(&PositionKey::new("b", "Yes")).await.unwrap().unwrap();
    assert_eq!(a.current_price, dec("0.52"));
    assert_eq!(b.current_price, dec("0.50"));
}

#[tokio::test]
async fn test_account_failure_fails_cycle() {
    let store = Arc::new(FlakyLedger::new(Decimal::from(1_500)));
    store.fail_get_account.store(true, Ordering::Relaxed);
    let engine = build_engine(store.clone(), StubMarket::default(), Arc::new(TemplateReasoner), vec![]);

    let result = engine.run_analysis_cycle().await;
    assert!(matches!(result, Err(EngineError::AccountUnavailable(_))));
}

#[tokio::test]
async fn test_trade_log_failure_skips_thought_only() {
    let store = Arc::new(FlakyLedger::new(Decimal::from(1_500)));
    store.fail_append_trade.store(true, Ordering::Relaxed);
    let market = StubMarket::default().with_trending(vec![opportunity("a", "Yes", dec("0.40"))]);
    let reasoner = Arc::new(RecordingReasoner::default());
    let engine = build_engine(store.clone(), market, reasoner.clone(), vec![0.0, 0.5]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.entries.len(), 1);
    assert!(report.entries[0].trade_id.is_none());
    assert_eq!(store.get_account().await.unwrap().balance, Decimal::from(1_350));
    assert_eq!(store.list_positions().await.unwrap().len(), 1);
    assert!(store.list_thoughts(10).await.unwrap().is_empty());
    assert!(reasoner.recorded().is_empty());
}

#[tokio::test]
async fn test_balance_write_failure_abandons_buy() {
    let store = Arc::new(FlakyLedger::new(Decimal::from(1_500)));
    store.fail_set_balance.store(true, Ordering::Relaxed);
    let market = StubMarket::default().with_trending(vec![opportunity("a", "Yes", dec("0.40"))]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.5]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert!(report.entries.is_empty());
    assert!(store.list_trades(10).await.unwrap().is_empty());
    assert!(store.list_positions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_balance_write_failure_abandons_sell() {
    let store = Arc::new(FlakyLedger::new(Decimal::from(1_000)));
    seed_position(&*store, "a", Decimal::from(50)).await;
    store.fail_set_balance.store(true, Ordering::Relaxed);
    // -30% trips cut loss
    let market = StubMarket::default().with_price("a", "Yes", dec("0.35"));
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert!(report.exits.is_empty());
    assert!(store.list_trades(10).await.unwrap().is_empty());
    assert_eq!(store.get_account().await.unwrap().balance, Decimal::from(1_000));

    let positions = store.list_positions().await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].shares, Decimal::from(100));
    assert_eq!(positions[0].current_price, dec("0.35"));
}

// ---------------------------------------------------------------------------
// Bad quotes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_out_of_range_candidates_are_skipped() {
    let store = memory(1_500);
    let market = StubMarket::default().with_trending(vec![
        // 150 / 1e-27 does not fit in a Decimal
        opportunity("tiny", "Yes", Decimal::new(1, 27)),
        opportunity("above", "Yes", dec("1.5")),
        opportunity("zero", "Yes", Decimal::ZERO),
        opportunity("ok", "Yes", dec("0.40")),
    ]);
    // tiny and ok are each accepted at 10%; the others never reach a draw
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.5, 0.0, 0.5]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].market_id, "ok");
    assert_eq!(store.get_account().await.unwrap().balance, Decimal::from(1_350));

    let positions = store.list_positions().await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].market_id, "ok");
    assert_eq!(store.list_trades(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_out_of_range_price_updates_are_ignored() {
    let store = memory(1_500);
    seed_position(&*store, "a", Decimal::from(50)).await;
    seed_position(&*store, "b", Decimal::from(50)).await;
    let market = StubMarket::default()
        .with_price("a", "Yes", dec("1.5"))
        .with_price("b", "Yes", Decimal::ZERO);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![]);

    let report = engine.run_analysis_cycle().await.unwrap();

    assert_eq!(report.prices_refreshed, 0);
    assert!(report.exits.is_empty());
    for position in store.list_positions().await.unwrap() {
        assert_eq!(position.current_price, dec("0.50"));
    }
}

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sell_reasoning_gets_exit_context() {
    let store = memory(1_000);
    seed_position(&*store, "a", Decimal::from(50)).await;
    let market = StubMarket::default().with_price("a", "Yes", dec("0.65"));
    let reasoner = Arc::new(RecordingReasoner::default());
    let engine = build_engine(store.clone(), market, reasoner.clone(), vec![]);

    engine.run_analysis_cycle().await.unwrap();

    let requests = reasoner.recorded();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.action, TradeAction::Sell);
    assert_eq!(request.price, dec("0.65"));
    assert_eq!(request.context.exit_reason.as_deref(), Some("take profit"));
    assert_eq!(request.context.realized_pnl, Some(Decimal::from(15)));
    assert!(request.context.stats.is_some());

    let thoughts = store.list_thoughts(10).await.unwrap();
    let trades = store.list_trades(10).await.unwrap();
    assert_eq!(thoughts[0].trade_id, trades[0].id);
    assert_eq!(thoughts[0].action.as_deref(), Some("SELL"));
}

#[tokio::test]
async fn test_buy_reasoning_gets_entry_reasons() {
    let store = memory(1_500);
    let market = StubMarket::default().with_trending(vec![opportunity("a", "Yes", dec("0.40"))]);
    let reasoner = Arc::new(RecordingReasoner::default());
    let engine = build_engine(store.clone(), market, reasoner.clone(), vec![0.0, 0.5]);

    engine.run_analysis_cycle().await.unwrap();

    let requests = reasoner.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, TradeAction::Buy);
    assert_eq!(requests[0].context.entry_reasons, vec!["high 24h volume ($25000)".to_string()]);
}

#[tokio::test]
async fn test_silent_reasoner_still_records_trade() {
    let store = memory(1_500);
    let market = StubMarket::default().with_trending(vec![opportunity("a", "Yes", dec("0.40"))]);
    let engine = build_engine(store.clone(), market, Arc::new(RecordingReasoner::silent()), vec![0.0, 0.5]);

    engine.run_analysis_cycle().await.unwrap();

    assert_eq!(store.list_trades(10).await.unwrap().len(), 1);
    assert!(store.list_thoughts(10).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dashboard_is_idempotent() {
    let store = memory(1_500);
    let market = StubMarket::default().with_trending(vec![
        opportunity("a", "Yes", dec("0.40")),
        opportunity("b", "No", dec("0.25")),
    ]);
    let engine = build_engine(store.clone(), market, Arc::new(TemplateReasoner), vec![0.0, 0.5, 0.0, 0.2]);
    engine.run_analysis_cycle().await.unwrap();

    let first = build_dashboard_snapshot(&*store, 20, 10).await.unwrap();
    let second = build_dashboard_snapshot(&*store, 20, 10).await.unwrap();

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.positions, second.positions);
    assert_eq!(first.stats.active_positions, 2);
    assert_eq!(first.stats.total_trades, 2);
    assert_eq!(first.thoughts.len(), 2);
}

#[tokio::test]
async fn test_dashboard_empty_state() {
    let store = memory(1_500);
    let snapshot = build_dashboard_snapshot(&*store, 20, 10).await.unwrap();

    assert_eq!(snapshot.stats.total_pnl, Decimal::ZERO);
    assert_eq!(snapshot.stats.win_rate, Decimal::ZERO);
    assert!(snapshot.stats.best_trade.is_none());
    assert!(snapshot.positions.is_empty());
}
