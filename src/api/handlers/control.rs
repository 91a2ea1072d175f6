use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// POST /api/control/stop: pause scheduled analysis.
pub async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(true, Ordering::Relaxed);
    tracing::warn!("Trading PAUSED via control API");
    (StatusCode::OK, Json(json!({ "status": "paused" })))
}

/// POST /api/control/resume: resume scheduled analysis.
pub async fn resume(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(false, Ordering::Relaxed);
    tracing::info!("Trading RESUMED via control API");
    (StatusCode::OK, Json(json!({ "status": "running" })))
}

/// GET /api/control/status: pause state and engine limits.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let paused = state.pause_flag.load(Ordering::Relaxed);
    let entry = &state.engine.config().entry;

    Json(json!({
        "paused": paused,
        "scheduler_enabled": state.config.scheduler_enabled,
        "analysis_interval_secs": state.config.analysis_interval_secs,
        "ledger": if state.config.database_url.is_some() { "postgres" } else { "memory" },
        "max_positions": entry.max_positions,
        "max_position_size": entry.max_position_size,
        "min_trade_size": entry.min_trade_size,
    }))
}
