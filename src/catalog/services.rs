use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{
    CreateProductRequest, ListQuery, ProductGroup, ProductListResponse, ProductSummary,
    MAX_PER_PAGE,
};
use super::filter::{facet_counts, group_indices, parse_slugs, sort_entries, Selection};
use super::repo;
use super::repo_types::CatalogEntry;
use crate::error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult};
use crate::state::AppState;
use crate::storage::ext_from_mime;

fn facet<B: super::filter::Bucket>(name: &str, raw: Option<&str>) -> AppResult<Vec<B>> {
    parse_slugs(raw).map_err(|bad| AppError::BadRequest(format!("Filter {name} tidak dikenal: {bad}")))
}

pub fn selection_from_query(q: &ListQuery) -> AppResult<Selection> {
    Ok(Selection {
        q: q.q.clone(),
        brand: q
            .brand
            .as_deref()
            .map(|b| {
                b.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        processor: facet("processor", q.processor.as_deref())?,
        ram: facet("ram", q.ram.as_deref())?,
        storage: facet("storage", q.storage.as_deref())?,
        price: facet("price", q.price.as_deref())?,
        screen: facet("screen", q.screen.as_deref())?,
    })
}

/// Clamped (page, per_page, offset) for a 1-based page number.
pub fn page_window(page: usize, per_page: usize) -> (usize, usize, usize) {
    let page = page.max(1);
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    (page, per_page, (page - 1) * per_page)
}

/// Filters, sorts and pages the catalog. Returns the page and the total match count.
pub fn select_page(
    entries: Vec<CatalogEntry>,
    selection: &Selection,
    query: &ListQuery,
) -> (Vec<CatalogEntry>, usize) {
    let mut matched: Vec<CatalogEntry> =
        entries.into_iter().filter(|e| selection.matches(e)).collect();
    sort_entries(&mut matched, query.sort);
    let total = matched.len();
    let (_, per_page, offset) = page_window(query.page, query.per_page);
    let page = matched.into_iter().skip(offset).take(per_page).collect();
    (page, total)
}

pub async fn list_products(state: &AppState, query: ListQuery) -> AppResult<ProductListResponse> {
    let selection = selection_from_query(&query)?;
    let entries = repo::list_entries(&state.db, false).await?;
    let facets = facet_counts(&entries, &selection);

    let (page_entries, total) = select_page(entries, &selection, &query);

    let groups = query.group_by.map(|by| {
        group_indices(&page_entries, by)
            .into_iter()
            .map(|(label, idx)| ProductGroup {
                label,
                product_ids: idx.into_iter().map(|i| page_entries[i].product.id).collect(),
            })
            .collect()
    });

    let mut items = Vec::with_capacity(page_entries.len());
    for e in &page_entries {
        let url = state.image_url(e.product.image_key.as_deref()).await;
        items.push(ProductSummary::new(e, url));
    }

    let (page, per_page, _) = page_window(query.page, query.per_page);
    Ok(ProductListResponse {
        items,
        total,
        page,
        per_page,
        facets,
        groups,
    })
}

pub async fn create_product(state: &AppState, req: CreateProductRequest) -> AppResult<CatalogEntry> {
    let name = req.name.trim();
    let brand = req.brand.trim();
    if name.is_empty() || brand.is_empty() {
        return Err(AppError::BadRequest("Nama dan merek wajib diisi".into()));
    }
    let fields = req
        .variants
        .into_iter()
        .map(|v| v.into_fields())
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::BadRequest)?;

    let mut tx = state.db.begin().await?;
    let product = repo::insert_product(
        &mut tx,
        name,
        brand,
        req.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
        req.is_active,
    )
    .await?;

    let mut variants = Vec::with_capacity(fields.len());
    for f in &fields {
        let v = repo::insert_variant(&mut *tx, product.id, f)
            .await
            .map_err(|e| sku_conflict(e, &f.sku))?;
        variants.push(v);
    }
    tx.commit().await?;

    info!(product_id = %product.id, variants = variants.len(), "product created");
    Ok(CatalogEntry { product, variants })
}

pub(crate) fn sku_conflict(e: anyhow::Error, sku: &str) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(format!("SKU {sku} sudah digunakan"))
    } else {
        AppError::Internal(e)
    }
}

pub enum DeleteOutcome {
    Deleted,
    Deactivated,
}

async fn deactivate(state: &AppState, id: Uuid) -> AppResult<DeleteOutcome> {
    repo::update_product(&state.db, id, None, None, None, Some(false))
        .await?
        .ok_or_else(|| AppError::not_found("Produk"))?;
    info!(product_id = %id, "product deactivated (has orders)");
    Ok(DeleteOutcome::Deactivated)
}

/// Products with order history are deactivated instead of deleted. An order
/// that lands between the check and the delete trips the `order_items`
/// foreign key and takes the same path.
pub async fn delete_product(state: &AppState, id: Uuid) -> AppResult<DeleteOutcome> {
    if repo::product_has_orders(&state.db, id).await? {
        return deactivate(state, id).await;
    }

    let image_key = match repo::delete_product(&state.db, id).await {
        Ok(found) => found.ok_or_else(|| AppError::not_found("Produk"))?,
        Err(e) if is_foreign_key_violation(&e) => {
            warn!(product_id = %id, "product gained orders during delete");
            return deactivate(state, id).await;
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(key) = image_key {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, %key, "failed to delete product image");
        }
    }
    info!(product_id = %id, "product deleted");
    Ok(DeleteOutcome::Deleted)
}

/// Stores a new product image and removes the previous object.
pub async fn upload_product_image(
    state: &AppState,
    product_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> AppResult<String> {
    let ext = ext_from_mime(content_type)
        .ok_or_else(|| AppError::BadRequest("Format gambar harus JPG, PNG, atau WEBP".into()))?;
    if body.is_empty() {
        return Err(AppError::BadRequest("File gambar kosong".into()));
    }
    if repo::find_entry(&state.db, product_id, true).await?.is_none() {
        return Err(AppError::not_found("Produk"));
    }

    let key = format!("products/{}/{}.{}", product_id, Uuid::new_v4(), ext);
    state
        .storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let previous = repo::set_image_key(&state.db, product_id, &key)
        .await?
        .ok_or_else(|| AppError::not_found("Produk"))?;
    if let Some(old) = previous {
        if let Err(e) = state.storage.delete_object(&old).await {
            warn!(error = %e, key = %old, "failed to delete previous product image");
        }
    }

    info!(%product_id, %key, "product image uploaded");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filter::{RamBucket, SortOrder};

    #[test]
    fn page_window_clamps() {
        assert_eq!(page_window(0, 12), (1, 12, 0));
        assert_eq!(page_window(3, 10), (3, 10, 20));
        assert_eq!(page_window(1, 1000), (1, MAX_PER_PAGE, 0));
        assert_eq!(page_window(2, 0), (2, 1, 1));
    }

    #[test]
    fn selection_parses_query() {
        let q = ListQuery {
            brand: Some("Lenovo, ASUS".into()),
            ram: Some("8gb,16gb".into()),
            ..Default::default()
        };
        let sel = selection_from_query(&q).ok().unwrap();
        assert_eq!(sel.brand, vec!["Lenovo".to_string(), "ASUS".to_string()]);
        assert_eq!(sel.ram, vec![RamBucket::Gb8, RamBucket::Gb16]);
        assert!(sel.processor.is_empty());
    }

    #[test]
    fn selection_rejects_unknown_slug() {
        let q = ListQuery {
            price: Some("cheap".into()),
            ..Default::default()
        };
        let err = selection_from_query(&q).err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("cheap"));
    }

    #[test]
    fn select_page_counts_all_matches() {
        use crate::catalog::repo_types::{Product, Variant};
        use time::OffsetDateTime;

        let entries: Vec<CatalogEntry> = (0..5)
            .map(|i| {
                let pid = Uuid::new_v4();
                CatalogEntry {
                    product: Product {
                        id: pid,
                        name: format!("Laptop {i}"),
                        brand: "Acer".into(),
                        description: None,
                        image_key: None,
                        is_active: true,
                        created_at: OffsetDateTime::UNIX_EPOCH,
                        updated_at: OffsetDateTime::UNIX_EPOCH,
                    },
                    variants: vec![Variant {
                        id: Uuid::new_v4(),
                        product_id: pid,
                        sku: format!("ACR-{i}"),
                        processor: "Intel Core i5-1335U".into(),
                        ram_gb: 8,
                        storage_gb: 512,
                        storage_type: "SSD".into(),
                        screen_inches: 14.0,
                        gpu: None,
                        color: None,
                        price: 6_000_000 + i64::from(i) * 1_000_000,
                        stock: 1,
                        created_at: OffsetDateTime::UNIX_EPOCH,
                    }],
                }
            })
            .collect();

        let q = ListQuery {
            sort: SortOrder::PriceDesc,
            page: 2,
            per_page: 2,
            ..Default::default()
        };
        let (page, total) = select_page(entries, &Selection::default(), &q);
        assert_eq!(total, 5);
        let names: Vec<&str> = page.iter().map(|e| e.product.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop 2", "Laptop 1"]);
    }

    #[tokio::test]
    async fn upload_rejects_non_image_before_touching_storage() {
        let state = AppState::fake();
        let err = upload_product_image(&state, Uuid::new_v4(), Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
