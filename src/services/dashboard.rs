use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::LedgerStore;
use crate::errors::StoreError;
use crate::intelligence::{compute_stats, Stats};
use crate::models::{PositionView, Thought, Trade};

/// Read-only view of the account for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub stats: Stats,
    pub positions: Vec<PositionView>,
    pub trades: Vec<Trade>,
    pub thoughts: Vec<Thought>,
    pub timestamp: DateTime<Utc>,
}

/// Assemble the dashboard from the ledger. Performs no writes beyond the
/// lazy account creation of `get_account`.
pub async fn build_dashboard_snapshot(
    store: &dyn LedgerStore,
    trades_limit: i64,
    thoughts_limit: i64,
) -> Result<DashboardSnapshot, StoreError> {
    let account = store.get_account().await?;
    let positions = store.list_positions().await?;
    let all_trades = store.all_trades().await?;
    let stats = compute_stats(&account, &all_trades, &positions);

    let trades = all_trades
        .into_iter()
        .take(usize::try_from(trades_limit.max(0)).unwrap_or(usize::MAX))
        .collect();
    let thoughts = store.list_thoughts(thoughts_limit).await?;

    Ok(DashboardSnapshot {
        stats,
        positions: positions.into_iter().map(PositionView::from).collect(),
        trades,
        thoughts,
        timestamp: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
