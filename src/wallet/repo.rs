use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_tx_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTxKind {
    Topup,
    Payment,
    Refund,
    Adjustment,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64, // signed Rupiah
    pub kind: WalletTxKind,
    pub order_id: Option<Uuid>,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

async fn record(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: i64,
    kind: WalletTxKind,
    order_id: Option<Uuid>,
    note: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (user_id, amount, kind, order_id, note)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(kind)
    .bind(order_id)
    .bind(note)
    .execute(&mut *conn)
    .await
    .context("insert wallet transaction")?;
    Ok(())
}

/// Applies a signed change to the balance and writes the ledger entry.
/// Returns the new balance, or `None` when the profile is missing or the
/// balance would go negative.
pub async fn apply(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: i64,
    kind: WalletTxKind,
    order_id: Option<Uuid>,
    note: Option<&str>,
) -> anyhow::Result<Option<i64>> {
    let balance = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE profiles
           SET wallet_balance = wallet_balance + $2
         WHERE id = $1 AND wallet_balance + $2 >= 0
        RETURNING wallet_balance
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await
    .context("update wallet balance")?;

    if balance.is_some() {
        record(conn, user_id, amount, kind, order_id, note).await?;
    }
    Ok(balance)
}

pub async fn balance(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<i64>> {
    let b = sqlx::query_scalar::<_, i64>("SELECT wallet_balance FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(b)
}

pub async fn list_transactions(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<WalletTransaction>> {
    let rows = sqlx::query_as::<_, WalletTransaction>(
        r#"
        SELECT id, user_id, amount, kind, order_id, note, created_at
          FROM wallet_transactions
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list wallet transactions")?;
    Ok(rows)
}
