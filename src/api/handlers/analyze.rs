use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::auth::bearer_matches;
use crate::errors::AppError;
use crate::execution::CycleReport;
use crate::AppState;

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub report: Option<CycleReport>,
}

/// GET|POST /api/analyze: run one analysis cycle now.
pub async fn analyze(State(state): State<AppState>) -> Result<Json<AnalyzeResponse>, AppError> {
    let report = state.engine.run_analysis_cycle().await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        message: "Analysis complete".into(),
        timestamp: Utc::now(),
        report: Some(report),
    }))
}

/// GET|POST /api/cron: scheduled trigger. Requires `Bearer $CRON_SECRET`
/// when configured and does nothing while trading is paused.
pub async fn cron(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if let Some(secret) = state.config.cron_secret.as_deref() {
        if !bearer_matches(&headers, secret) {
            tracing::warn!("Cron trigger rejected: bad secret");
            return Err(AppError::Unauthorized);
        }
    }

    if state.pause_flag.load(Ordering::Relaxed) {
        return Ok(Json(AnalyzeResponse {
            success: true,
            message: "Trading paused, cycle skipped".into(),
            timestamp: Utc::now(),
            report: None,
        }));
    }

    let report = state.engine.run_analysis_cycle().await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        message: "Cron analysis complete".into(),
        timestamp: Utc::now(),
        report: Some(report),
    }))
}
