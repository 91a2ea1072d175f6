use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::services::dashboard::{build_dashboard_snapshot, DashboardSnapshot};
use crate::AppState;

/// GET /api/dashboard: stats, open positions with P&L, recent trades and thoughts.
pub async fn snapshot(State(state): State<AppState>) -> Result<Json<DashboardSnapshot>, AppError> {
    let snapshot = build_dashboard_snapshot(
        state.store.as_ref(),
        state.config.dashboard_trades_limit,
        state.config.dashboard_thoughts_limit,
    )
    .await?;

    Ok(Json(snapshot))
}
