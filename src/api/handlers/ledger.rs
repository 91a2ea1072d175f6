use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{PositionView, Thought, Trade};
use crate::AppState;

use super::ApiResponse;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

impl ListParams {
    fn limit(&self) -> Result<i64, AppError> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(n) if n < 1 => Err(AppError::BadRequest(format!("limit must be positive, got {n}"))),
            Some(n) => Ok(n.min(MAX_LIMIT)),
        }
    }
}

/// GET /api/positions: open positions with mark-to-market P&L.
pub async fn positions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PositionView>>>, AppError> {
    let positions = state.store.list_positions().await?;
    Ok(Json(ApiResponse::ok(
        positions.into_iter().map(PositionView::from).collect(),
    )))
}

/// GET /api/trades?limit=N: most recent trades first.
pub async fn trades(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let trades = state.store.list_trades(params.limit()?).await?;
    Ok(Json(ApiResponse::ok(trades)))
}

/// GET /api/thoughts?limit=N: most recent thoughts first.
pub async fn thoughts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Thought>>>, AppError> {
    let thoughts = state.store.list_thoughts(params.limit()?).await?;
    Ok(Json(ApiResponse::ok(thoughts)))
}
