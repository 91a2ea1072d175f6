use sqlx::PgPool;

use crate::errors::StoreError;
use crate::models::{NewTrade, Trade};

/// Append a trade to the log.
pub async fn insert_trade(pool: &PgPool, trade: &NewTrade) -> Result<Trade, StoreError> {
    let row = sqlx::query_as::<_, Trade>(
        r#"
        INSERT INTO trades (market_id, market_slug, market_title, outcome, action, shares, price, total, pnl)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&trade.market_id)
    .bind(&trade.market_slug)
    .bind(&trade.market_title)
    .bind(&trade.outcome)
    .bind(trade.action.as_str())
    .bind(trade.shares)
    .bind(trade.price)
    .bind(trade.total)
    .bind(trade.pnl)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Get the N most recent trades.
pub async fn get_recent_trades(pool: &PgPool, limit: i64) -> Result<Vec<Trade>, StoreError> {
    let trades = sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

pub async fn get_all_trades(pool: &PgPool) -> Result<Vec<Trade>, StoreError> {
    let trades = sqlx::query_as::<_, Trade>("SELECT * FROM trades ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(trades)
}
