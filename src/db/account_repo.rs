use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::errors::StoreError;
use crate::models::Account;

/// Fetch the account row, inserting it with `initial_balance` on first use.
pub async fn get_or_create_account(
    pool: &PgPool,
    initial_balance: Decimal,
) -> Result<Account, StoreError> {
    sqlx::query(
        r#"
        INSERT INTO account (id, balance, initial_balance)
        VALUES ($1, $2, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(Account::SINGLETON_ID)
    .bind(initial_balance)
    .execute(pool)
    .await?;

    let account = sqlx::query_as::<_, Account>("SELECT * FROM account WHERE id = $1")
        .bind(Account::SINGLETON_ID)
        .fetch_one(pool)
        .await?;

    Ok(account)
}

/// Overwrite the spendable balance.
pub async fn update_balance(pool: &PgPool, balance: Decimal) -> Result<(), StoreError> {
    sqlx::query("UPDATE account SET balance = $2, updated_at = $3 WHERE id = $1")
        .bind(Account::SINGLETON_ID)
        .bind(balance)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(())
}
