use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub order_id: Option<Uuid>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn insert<'e, E>(
    exec: E,
    user_id: Uuid,
    title: &str,
    message: &str,
    order_id: Option<Uuid>,
) -> anyhow::Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, order_id)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(order_id)
    .execute(exec)
    .await
    .context("insert notification")?;
    Ok(())
}

/// Fans one notification out to every admin; returns how many were written.
pub async fn insert_for_admins<'e, E>(
    exec: E,
    title: &str,
    message: &str,
    order_id: Option<Uuid>,
) -> anyhow::Result<u64>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let res = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, order_id)
        SELECT id, $1, $2, $3 FROM profiles WHERE role = 'admin'
        "#,
    )
    .bind(title)
    .bind(message)
    .bind(order_id)
    .execute(exec)
    .await
    .context("insert admin notifications")?;
    Ok(res.rows_affected())
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
) -> anyhow::Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, title, message, order_id, is_read, created_at
          FROM notifications
         WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
         ORDER BY created_at DESC
         LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list notifications")?;
    Ok(rows)
}

pub async fn unread_count(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(n)
}

pub async fn mark_read(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn mark_all_read(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
