use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::repo::PROFILE_COLUMNS;
use crate::auth::repo_types::{Profile, Role};

/// Profile with its order count.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    #[sqlx(flatten)]
    pub profile: Profile,
    pub order_count: i64,
}

const ORDER_COUNT: &str =
    "(SELECT COUNT(*) FROM orders o WHERE o.user_id = profiles.id) AS order_count";

pub async fn list(
    db: &PgPool,
    q: Option<&str>,
    role: Option<Role>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<UserRow>, i64)> {
    let pattern = q
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    let where_clause = r#"
         WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1 OR full_name ILIKE $1)
           AND ($2::user_role IS NULL OR role = $2)
    "#;

    let sql = format!(
        "SELECT {PROFILE_COLUMNS}, {ORDER_COUNT} FROM profiles {where_clause} \
         ORDER BY created_at DESC, id LIMIT $3 OFFSET $4"
    );
    let rows = sqlx::query_as::<_, UserRow>(&sql)
        .bind(pattern.as_deref())
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list users")?;

    let count_sql = format!("SELECT COUNT(*) FROM profiles {where_clause}");
    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(pattern.as_deref())
        .bind(role)
        .fetch_one(db)
        .await
        .context("count users")?;
    Ok((rows, total))
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserRow>> {
    let sql = format!("SELECT {PROFILE_COLUMNS}, {ORDER_COUNT} FROM profiles WHERE id = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> anyhow::Result<Option<Profile>> {
    let sql = format!("UPDATE profiles SET role = $2 WHERE id = $1 RETURNING {PROFILE_COLUMNS}");
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await
        .context("set role")?;
    Ok(profile)
}

/// Deletes the profile unless it has orders; the check and delete are one statement.
/// Returns false when nothing was deleted.
pub async fn delete_without_orders(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        DELETE FROM profiles
         WHERE id = $1
           AND NOT EXISTS (SELECT 1 FROM orders WHERE user_id = $1)
        "#,
    )
    .bind(id)
    .execute(db)
    .await
    .context("delete user")?;
    Ok(res.rows_affected() > 0)
}
