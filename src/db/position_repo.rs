use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::errors::StoreError;
use crate::models::{Position, PositionKey};

/// Insert a position, or overwrite the row already held for its market/outcome.
pub async fn upsert_position(pool: &PgPool, position: &Position) -> Result<Position, StoreError> {
    let row = sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions
            (id, market_id, market_slug, market_title, outcome, shares, entry_price, current_price, invested)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (market_id, outcome) DO UPDATE
        SET market_slug = EXCLUDED.market_slug,
            market_title = EXCLUDED.market_title,
            shares = EXCLUDED.shares,
            entry_price = EXCLUDED.entry_price,
            current_price = EXCLUDED.current_price,
            invested = EXCLUDED.invested,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(position.id)
    .bind(&position.market_id)
    .bind(&position.market_slug)
    .bind(&position.market_title)
    .bind(&position.outcome)
    .bind(position.shares)
    .bind(position.entry_price)
    .bind(position.current_price)
    .bind(position.invested)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Get all open positions.
pub async fn get_open_positions(pool: &PgPool) -> Result<Vec<Position>, StoreError> {
    let positions = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(positions)
}

pub async fn get_position(pool: &PgPool, key: &PositionKey) -> Result<Option<Position>, StoreError> {
    let position = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE market_id = $1 AND outcome = $2",
    )
    .bind(&key.market_id)
    .bind(&key.outcome)
    .fetch_optional(pool)
    .await?;

    Ok(position)
}

pub async fn delete_position(pool: &PgPool, key: &PositionKey) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM positions WHERE market_id = $1 AND outcome = $2")
        .bind(&key.market_id)
        .bind(&key.outcome)
        .execute(pool)
        .await?;

    Ok(())
}

/// Mark a position to a fresh price.
pub async fn update_position_price(
    pool: &PgPool,
    key: &PositionKey,
    current_price: Decimal,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE positions
        SET current_price = $3, updated_at = $4
        WHERE market_id = $1 AND outcome = $2
        "#,
    )
    .bind(&key.market_id)
    .bind(&key.outcome)
    .bind(current_price)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
