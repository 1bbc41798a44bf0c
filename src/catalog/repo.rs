use std::collections::HashMap;

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::SearchHit;
use super::repo_types::{CatalogEntry, Product, Variant, VariantFields};

const PRODUCT_COLUMNS: &str =
    "id, name, brand, description, image_key, is_active, created_at, updated_at";
const VARIANT_COLUMNS: &str = "id, product_id, sku, processor, ram_gb, storage_gb, storage_type, \
     screen_inches, gpu, color, price, stock, created_at";

async fn attach_variants(db: &PgPool, products: Vec<Product>) -> anyhow::Result<Vec<CatalogEntry>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let sql = format!(
        "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = ANY($1) ORDER BY price ASC"
    );
    let variants = sqlx::query_as::<_, Variant>(&sql)
        .bind(&ids)
        .fetch_all(db)
        .await
        .context("load variants")?;

    let mut by_product: HashMap<Uuid, Vec<Variant>> = HashMap::new();
    for v in variants {
        by_product.entry(v.product_id).or_default().push(v);
    }

    Ok(products
        .into_iter()
        .map(|product| {
            let variants = by_product.remove(&product.id).unwrap_or_default();
            CatalogEntry { product, variants }
        })
        .collect())
}

/// All products with their variants; inactive products only when asked.
pub async fn list_entries(db: &PgPool, include_inactive: bool) -> anyhow::Result<Vec<CatalogEntry>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE ($1 OR is_active) ORDER BY created_at DESC"
    );
    let products = sqlx::query_as::<_, Product>(&sql)
        .bind(include_inactive)
        .fetch_all(db)
        .await
        .context("list products")?;
    attach_variants(db, products).await
}

pub async fn find_entry(
    db: &PgPool,
    id: Uuid,
    include_inactive: bool,
) -> anyhow::Result<Option<CatalogEntry>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND ($2 OR is_active)");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(include_inactive)
        .fetch_optional(db)
        .await
        .context("find product")?;
    match product {
        Some(p) => Ok(attach_variants(db, vec![p]).await?.pop()),
        None => Ok(None),
    }
}

/// Quick search over active products by name, brand or variant processor.
pub async fn search(db: &PgPool, q: &str, limit: i64) -> anyhow::Result<Vec<SearchHit>> {
    let pattern = format!("%{}%", q.replace('%', "\\%").replace('_', "\\_"));
    let rows = sqlx::query_as::<_, SearchHit>(
        r#"
        SELECT p.id, p.name, p.brand, MIN(v.price) AS min_price
          FROM products p
          LEFT JOIN product_variants v ON v.product_id = p.id
         WHERE p.is_active
           AND (p.name ILIKE $1 OR p.brand ILIKE $1 OR v.processor ILIKE $1)
         GROUP BY p.id, p.name, p.brand
         ORDER BY p.name ASC
         LIMIT $2
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("search products")?;
    Ok(rows)
}

pub async fn insert_product(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    name: &str,
    brand: &str,
    description: Option<&str>,
    is_active: bool,
) -> anyhow::Result<Product> {
    let sql = format!(
        r#"
        INSERT INTO products (name, brand, description, is_active)
        VALUES ($1, $2, $3, $4)
        RETURNING {PRODUCT_COLUMNS}
        "#
    );
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(name)
        .bind(brand)
        .bind(description)
        .bind(is_active)
        .fetch_one(&mut **tx)
        .await
        .context("insert product")?;
    Ok(product)
}

pub async fn update_product(
    db: &PgPool,
    id: Uuid,
    name: Option<&str>,
    brand: Option<&str>,
    description: Option<&str>,
    is_active: Option<bool>,
) -> anyhow::Result<Option<Product>> {
    let sql = format!(
        r#"
        UPDATE products
           SET name        = COALESCE($2, name),
               brand       = COALESCE($3, brand),
               description = COALESCE($4, description),
               is_active   = COALESCE($5, is_active),
               updated_at  = now()
         WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    );
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(name)
        .bind(brand)
        .bind(description)
        .bind(is_active)
        .fetch_optional(db)
        .await
        .context("update product")?;
    Ok(product)
}

/// Replaces the image key, returning the previous one.
pub async fn set_image_key(db: &PgPool, id: Uuid, key: &str) -> anyhow::Result<Option<Option<String>>> {
    let previous = sqlx::query_scalar::<_, Option<String>>(
        r#"
        WITH old AS (
            SELECT image_key FROM products WHERE id = $1 FOR UPDATE
        )
        UPDATE products
           SET image_key = $2, updated_at = now()
         WHERE id = $1
        RETURNING (SELECT image_key FROM old)
        "#,
    )
    .bind(id)
    .bind(key)
    .fetch_optional(db)
    .await
    .context("set image key")?;
    Ok(previous)
}

pub async fn product_has_orders(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM order_items oi
              JOIN product_variants v ON v.id = oi.variant_id
             WHERE v.product_id = $1
        )
        "#,
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Deletes the product (variants cascade); returns its image key when it existed.
pub async fn delete_product(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Option<String>>> {
    let key = sqlx::query_scalar::<_, Option<String>>(
        "DELETE FROM products WHERE id = $1 RETURNING image_key",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("delete product")?;
    Ok(key)
}

pub async fn find_variant(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Variant>> {
    let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1");
    let v = sqlx::query_as::<_, Variant>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(v)
}

pub async fn insert_variant<'e, E>(
    exec: E,
    product_id: Uuid,
    f: &VariantFields,
) -> anyhow::Result<Variant>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let sql = format!(
        r#"
        INSERT INTO product_variants
            (product_id, sku, processor, ram_gb, storage_gb, storage_type,
             screen_inches, gpu, color, price, stock)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {VARIANT_COLUMNS}
        "#
    );
    let v = sqlx::query_as::<_, Variant>(&sql)
        .bind(product_id)
        .bind(&f.sku)
        .bind(&f.processor)
        .bind(f.ram_gb)
        .bind(f.storage_gb)
        .bind(&f.storage_type)
        .bind(f.screen_inches)
        .bind(f.gpu.as_deref())
        .bind(f.color.as_deref())
        .bind(f.price)
        .bind(f.stock)
        .fetch_one(exec)
        .await
        .context("insert variant")?;
    Ok(v)
}

pub async fn update_variant(
    db: &PgPool,
    id: Uuid,
    f: &VariantFields,
) -> anyhow::Result<Option<Variant>> {
    let sql = format!(
        r#"
        UPDATE product_variants
           SET sku = $2, processor = $3, ram_gb = $4, storage_gb = $5, storage_type = $6,
               screen_inches = $7, gpu = $8, color = $9, price = $10, stock = $11
         WHERE id = $1
        RETURNING {VARIANT_COLUMNS}
        "#
    );
    let v = sqlx::query_as::<_, Variant>(&sql)
        .bind(id)
        .bind(&f.sku)
        .bind(&f.processor)
        .bind(f.ram_gb)
        .bind(f.storage_gb)
        .bind(&f.storage_type)
        .bind(f.screen_inches)
        .bind(f.gpu.as_deref())
        .bind(f.color.as_deref())
        .bind(f.price)
        .bind(f.stock)
        .fetch_optional(db)
        .await
        .context("update variant")?;
    Ok(v)
}

pub async fn set_stock(db: &PgPool, id: Uuid, stock: i32) -> anyhow::Result<Option<Variant>> {
    let sql = format!(
        "UPDATE product_variants SET stock = $2 WHERE id = $1 RETURNING {VARIANT_COLUMNS}"
    );
    let v = sqlx::query_as::<_, Variant>(&sql)
        .bind(id)
        .bind(stock)
        .fetch_optional(db)
        .await
        .context("set stock")?;
    Ok(v)
}

pub async fn variant_has_orders(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM order_items WHERE variant_id = $1)",
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn delete_variant(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM product_variants WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete variant")?;
    Ok(res.rows_affected() > 0)
}
