use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::orders::status::{OrderStatus, PaymentMethod};

/// Half-open `[from, to)` window plus an optional status filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportRange {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderReportRow {
    pub code: String,
    pub created_at: OffsetDateTime,
    pub username: String,
    pub recipient_name: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub item_count: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopProduct {
    pub product_name: String,
    pub units: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyRevenue {
    #[serde(with = "time::serde::rfc3339")]
    pub month: OffsetDateTime,
    pub orders: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct InventoryRow {
    pub product_name: String,
    pub brand: String,
    pub is_active: bool,
    pub sku: String,
    pub processor: String,
    pub ram_gb: i32,
    pub storage_gb: i32,
    pub storage_type: String,
    pub screen_inches: f64,
    pub price: i64,
    pub stock: i32,
}

const RANGE_WHERE: &str = r#"
    ($1::timestamptz IS NULL OR o.created_at >= $1)
    AND ($2::timestamptz IS NULL OR o.created_at < $2)
"#;

pub async fn order_rows(db: &PgPool, range: &ReportRange) -> anyhow::Result<Vec<OrderReportRow>> {
    let sql = format!(
        r#"
        SELECT o.code, o.created_at, u.username, o.recipient_name, o.status, o.payment_method,
               COALESCE((SELECT SUM(i.quantity) FROM order_items i WHERE i.order_id = o.id), 0)::bigint
                   AS item_count,
               o.total
          FROM orders o
          JOIN profiles u ON u.id = o.user_id
         WHERE {RANGE_WHERE}
           AND ($3::order_status IS NULL OR o.status = $3)
         ORDER BY o.created_at ASC, o.code
        "#
    );
    let rows = sqlx::query_as::<_, OrderReportRow>(&sql)
        .bind(range.from)
        .bind(range.to)
        .bind(range.status)
        .fetch_all(db)
        .await
        .context("load order report rows")?;
    Ok(rows)
}

/// Revenue from completed orders in the window.
pub async fn revenue(db: &PgPool, range: &ReportRange) -> anyhow::Result<(i64, i64)> {
    let sql = format!(
        r#"
        SELECT COUNT(*), COALESCE(SUM(o.total), 0)::bigint
          FROM orders o
         WHERE {RANGE_WHERE} AND o.status = $3
        "#
    );
    let row = sqlx::query_as::<_, (i64, i64)>(&sql)
        .bind(range.from)
        .bind(range.to)
        .bind(OrderStatus::Selesai)
        .fetch_one(db)
        .await
        .context("sum revenue")?;
    Ok(row)
}

pub async fn status_counts(db: &PgPool, range: &ReportRange) -> anyhow::Result<Vec<StatusCount>> {
    let sql = format!(
        r#"
        SELECT o.status, COUNT(*) AS orders
          FROM orders o
         WHERE {RANGE_WHERE}
         GROUP BY o.status
        "#
    );
    let rows = sqlx::query_as::<_, StatusCount>(&sql)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(db)
        .await
        .context("count orders per status")?;
    Ok(rows)
}

/// Best sellers by units over orders that were not cancelled.
pub async fn top_products(
    db: &PgPool,
    range: &ReportRange,
    limit: i64,
) -> anyhow::Result<Vec<TopProduct>> {
    let sql = format!(
        r#"
        SELECT i.product_name,
               SUM(i.quantity)::bigint AS units,
               SUM(i.unit_price * i.quantity)::bigint AS revenue
          FROM order_items i
          JOIN orders o ON o.id = i.order_id
         WHERE {RANGE_WHERE} AND o.status <> $3
         GROUP BY i.product_name
         ORDER BY units DESC, revenue DESC, i.product_name
         LIMIT $4
        "#
    );
    let rows = sqlx::query_as::<_, TopProduct>(&sql)
        .bind(range.from)
        .bind(range.to)
        .bind(OrderStatus::Dibatalkan)
        .bind(limit)
        .fetch_all(db)
        .await
        .context("top products")?;
    Ok(rows)
}

/// Completed-order revenue per store-local calendar month.
pub async fn monthly_revenue(
    db: &PgPool,
    range: &ReportRange,
    tz: &str,
) -> anyhow::Result<Vec<MonthlyRevenue>> {
    let sql = format!(
        r#"
        SELECT date_trunc('month', o.created_at, $4) AS month,
               COUNT(*) AS orders,
               COALESCE(SUM(o.total), 0)::bigint AS revenue
          FROM orders o
         WHERE {RANGE_WHERE} AND o.status = $3
         GROUP BY 1
         ORDER BY 1
        "#
    );
    let rows = sqlx::query_as::<_, MonthlyRevenue>(&sql)
        .bind(range.from)
        .bind(range.to)
        .bind(OrderStatus::Selesai)
        .bind(tz)
        .fetch_all(db)
        .await
        .context("monthly revenue")?;
    Ok(rows)
}

pub async fn inventory(db: &PgPool) -> anyhow::Result<Vec<InventoryRow>> {
    let rows = sqlx::query_as::<_, InventoryRow>(
        r#"
        SELECT p.name AS product_name, p.brand, p.is_active,
               v.sku, v.processor, v.ram_gb, v.storage_gb, v.storage_type, v.screen_inches,
               v.price, v.stock
          FROM product_variants v
          JOIN products p ON p.id = v.product_id
         ORDER BY p.brand, p.name, v.price
        "#,
    )
    .fetch_all(db)
    .await
    .context("load inventory")?;
    Ok(rows)
}
