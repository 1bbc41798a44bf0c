use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::catalog::repo_types::Variant;

/// A cart line joined with its variant and product.
#[derive(Debug, Clone, FromRow)]
pub struct CartLineRow {
    pub quantity: i32,
    pub product_name: String,
    pub brand: String,
    pub image_key: Option<String>,
    pub is_active: bool,
    #[sqlx(flatten)]
    pub variant: Variant,
}

pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CartLineRow>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT c.quantity,
               p.name AS product_name, p.brand, p.image_key, p.is_active,
               v.id, v.product_id, v.sku, v.processor, v.ram_gb, v.storage_gb, v.storage_type,
               v.screen_inches, v.gpu, v.color, v.price, v.stock, v.created_at
          FROM cart_items c
          JOIN product_variants v ON v.id = c.variant_id
          JOIN products p ON p.id = v.product_id
         WHERE c.user_id = $1
         ORDER BY c.added_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list cart")?;
    Ok(rows)
}

pub async fn quantity_of(db: &PgPool, user_id: Uuid, variant_id: Uuid) -> anyhow::Result<i32> {
    let qty = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM cart_items WHERE user_id = $1 AND variant_id = $2",
    )
    .bind(user_id)
    .bind(variant_id)
    .fetch_optional(db)
    .await?;
    Ok(qty.unwrap_or(0))
}

/// Inserts or replaces the line quantity.
pub async fn set_quantity(
    db: &PgPool,
    user_id: Uuid,
    variant_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_items (user_id, variant_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, variant_id) DO UPDATE SET quantity = EXCLUDED.quantity
        "#,
    )
    .bind(user_id)
    .bind(variant_id)
    .bind(quantity)
    .execute(db)
    .await
    .context("set cart quantity")?;
    Ok(())
}

pub async fn remove(db: &PgPool, user_id: Uuid, variant_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND variant_id = $2")
        .bind(user_id)
        .bind(variant_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn clear(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
