use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::{LockedVariant, NewOrder, NewOrderItem, Order, OrderItem, OrderListRow};
use super::status::OrderStatus;

const ORDER_COLUMNS: &str = "o.id, o.code, o.user_id, o.status, o.payment_method, \
     o.payment_reference, o.recipient_name, o.phone, o.shipping_address, o.note, o.total, \
     o.cancel_reason, o.created_at, o.updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, variant_id, product_name, variant_label, unit_price, quantity";

/// Locks the given variants in id order and returns them with their product.
pub async fn lock_variants(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> anyhow::Result<Vec<LockedVariant>> {
    let rows = sqlx::query_as::<_, LockedVariant>(
        r#"
        SELECT v.id, v.product_id, v.sku, v.processor, v.ram_gb, v.storage_gb, v.storage_type,
               v.screen_inches, v.gpu, v.color, v.price, v.stock, v.created_at,
               p.name AS product_name, p.is_active
          FROM product_variants v
          JOIN products p ON p.id = v.product_id
         WHERE v.id = ANY($1)
         ORDER BY v.id
           FOR UPDATE OF v
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
    .context("lock variants")?;
    Ok(rows)
}

/// Returns false when the stock is short; the row is left untouched then.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    variant_id: Uuid,
    quantity: i32,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE product_variants SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
    )
    .bind(variant_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await
    .context("decrement stock")?;
    Ok(res.rows_affected() == 1)
}

/// Puts every item of the order back into stock.
pub async fn restock(conn: &mut PgConnection, order_id: Uuid) -> anyhow::Result<u64> {
    sqlx::query(
        r#"
        SELECT v.id FROM product_variants v
         WHERE v.id IN (SELECT variant_id FROM order_items WHERE order_id = $1)
         ORDER BY v.id
           FOR UPDATE
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .context("lock order variants")?;

    let res = sqlx::query(
        r#"
        UPDATE product_variants v
           SET stock = v.stock + i.quantity
          FROM order_items i
         WHERE i.order_id = $1 AND i.variant_id = v.id
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .context("restock order items")?;
    Ok(res.rows_affected())
}

/// Inserts the order; `None` when the code is already taken.
pub async fn insert_order(
    conn: &mut PgConnection,
    new: &NewOrder<'_>,
) -> anyhow::Result<Option<Order>> {
    let sql = format!(
        r#"
        INSERT INTO orders AS o (code, user_id, status, payment_method, payment_reference,
                                 recipient_name, phone, shipping_address, note, total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (code) DO NOTHING
        RETURNING {ORDER_COLUMNS}
        "#
    );
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(new.code)
        .bind(new.user_id)
        .bind(OrderStatus::MenungguKonfirmasi)
        .bind(new.payment_method)
        .bind(new.payment_reference)
        .bind(new.recipient_name)
        .bind(new.phone)
        .bind(new.shipping_address)
        .bind(new.note)
        .bind(new.total)
        .fetch_optional(&mut *conn)
        .await
        .context("insert order")?;
    Ok(order)
}

pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    items: &[NewOrderItem],
) -> anyhow::Result<()> {
    let variant_ids: Vec<Uuid> = items.iter().map(|i| i.variant_id).collect();
    let names: Vec<&str> = items.iter().map(|i| i.product_name.as_str()).collect();
    let labels: Vec<&str> = items.iter().map(|i| i.variant_label.as_str()).collect();
    let prices: Vec<i64> = items.iter().map(|i| i.unit_price).collect();
    let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();

    sqlx::query(
        r#"
        INSERT INTO order_items (order_id, variant_id, product_name, variant_label, unit_price, quantity)
        SELECT $1::uuid, * FROM UNNEST($2::uuid[], $3::text[], $4::text[], $5::bigint[], $6::int[])
        "#,
    )
    .bind(order_id)
    .bind(&variant_ids)
    .bind(&names)
    .bind(&labels)
    .bind(&prices)
    .bind(&quantities)
    .execute(&mut *conn)
    .await
    .context("insert order items")?;
    Ok(())
}

pub async fn remove_cart_lines(
    conn: &mut PgConnection,
    user_id: Uuid,
    variant_ids: &[Uuid],
) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND variant_id = ANY($2)")
        .bind(user_id)
        .bind(variant_ids)
        .execute(&mut *conn)
        .await
        .context("remove ordered cart lines")?;
    Ok(res.rows_affected())
}

pub async fn lock_order(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 FOR UPDATE");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("lock order")?;
    Ok(order)
}

pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: OrderStatus,
    cancel_reason: Option<&str>,
) -> anyhow::Result<Order> {
    let sql = format!(
        r#"
        UPDATE orders o
           SET status = $2,
               cancel_reason = COALESCE($3, o.cancel_reason),
               updated_at = now()
         WHERE o.id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    );
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .bind(status)
        .bind(cancel_reason)
        .fetch_one(&mut *conn)
        .await
        .context("update order status")?;
    Ok(order)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(order)
}

pub async fn items(db: &PgPool, order_id: Uuid) -> anyhow::Result<Vec<OrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY product_name, id");
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(db)
        .await
        .context("list order items")?;
    Ok(rows)
}

/// Listing filter shared by customer and admin views.
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    /// Matches the order code or the buyer's username.
    pub q: Option<String>,
}

/// One page of orders plus the total match count.
pub async fn list(
    db: &PgPool,
    filter: &OrderFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<OrderListRow>, i64)> {
    let pattern = filter.q.as_deref().map(|q| format!("%{}%", q.trim()));
    let where_clause = r#"
         WHERE ($1::uuid IS NULL OR o.user_id = $1)
           AND ($2::order_status IS NULL OR o.status = $2)
           AND ($3::text IS NULL OR o.code ILIKE $3 OR u.username ILIKE $3)
    "#;

    let sql = format!(
        r#"
        SELECT {ORDER_COLUMNS}, u.username,
               (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count
          FROM orders o
          JOIN profiles u ON u.id = o.user_id
        {where_clause}
         ORDER BY o.created_at DESC, o.id
         LIMIT $4 OFFSET $5
        "#
    );
    let rows = sqlx::query_as::<_, OrderListRow>(&sql)
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list orders")?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM orders o JOIN profiles u ON u.id = o.user_id {where_clause}"
    );
    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(pattern.as_deref())
        .fetch_one(db)
        .await
        .context("count orders")?;

    Ok((rows, total))
}
