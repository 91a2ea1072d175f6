use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::Thought;

/// Insert a thought for `trade_id`, copying the trade's market title,
/// action and outcome onto the row.
pub async fn insert_thought(
    pool: &PgPool,
    trade_id: Uuid,
    content: &str,
) -> Result<Thought, StoreError> {
    let thought = sqlx::query_as::<_, Thought>(
        r#"
        INSERT INTO thoughts (trade_id, content, market_title, action, outcome)
        VALUES (
            $1,
            $2,
            (SELECT market_title FROM trades WHERE id = $1),
            (SELECT action FROM trades WHERE id = $1),
            (SELECT outcome FROM trades WHERE id = $1)
        )
        RETURNING *
        "#,
    )
    .bind(trade_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    Ok(thought)
}

/// Get the N most recent thoughts.
pub async fn get_recent_thoughts(pool: &PgPool, limit: i64) -> Result<Vec<Thought>, StoreError> {
    let thoughts = sqlx::query_as::<_, Thought>(
        "SELECT * FROM thoughts ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(thoughts)
}
