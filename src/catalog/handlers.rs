use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    AdminListQuery, CreateProductRequest, ListQuery, ProductDetail, ProductListResponse,
    ProductSummary, SearchHit, SearchQuery, SetStockRequest, UpdateProductRequest, VariantInput,
    VariantView,
};
use super::services::{self, DeleteOutcome};
use super::{filter::Selection, repo};
use crate::{
    auth::AdminUser,
    error::{is_foreign_key_violation, AppError, AppResult, MessageBody},
    state::AppState,
};

const SEARCH_LIMIT: i64 = 10;
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const VARIANT_ORDERED: &str =
    "Varian sudah pernah dipesan; ubah stok menjadi 0 untuk menyembunyikannya";

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/products/:id", get(get_product))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/products", get(admin_list_products).post(create_product))
        .route(
            "/admin/products/:id",
            put(update_product).delete(delete_product),
        )
        .route(
            "/admin/products/:id/image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/admin/products/:id/variants", post(create_variant))
        .route(
            "/admin/variants/:id",
            put(update_variant).delete(delete_variant),
        )
        .route("/admin/variants/:id/stock", put(set_stock))
}

async fn detail(state: &AppState, id: Uuid, include_inactive: bool) -> AppResult<ProductDetail> {
    let entry = repo::find_entry(&state.db, id, include_inactive)
        .await?
        .ok_or_else(|| AppError::not_found("Produk"))?;
    let url = state.image_url(entry.product.image_key.as_deref()).await;
    Ok(ProductDetail::new(&entry, url))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ProductListResponse>> {
    Ok(Json(services::list_products(&state, query).await?))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<SearchHit>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(repo::search(&state.db, q, SEARCH_LIMIT).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductDetail>> {
    Ok(Json(detail(&state, id, false).await?))
}

// --- admin ---

#[instrument(skip(state))]
pub async fn admin_list_products(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<Vec<ProductSummary>>> {
    let selection = Selection {
        q: query.q,
        ..Default::default()
    };
    let entries = repo::list_entries(&state.db, query.include_inactive).await?;
    let mut items = Vec::new();
    for e in entries.iter().filter(|e| selection.text_matches(e)) {
        let url = state.image_url(e.product.image_key.as_deref()).await;
        items.push(ProductSummary::new(e, url));
    }
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ProductDetail>)> {
    let entry = services::create_product(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(ProductDetail::new(&entry, None))))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ProductDetail>> {
    let trimmed = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };
    repo::update_product(
        &state.db,
        id,
        trimmed(&payload.name).as_deref(),
        trimmed(&payload.brand).as_deref(),
        trimmed(&payload.description).as_deref(),
        payload.is_active,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Produk"))?;
    Ok(Json(detail(&state, id, true).await?))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageBody>> {
    let msg = match services::delete_product(&state, id).await? {
        DeleteOutcome::Deleted => "Produk berhasil dihapus",
        DeleteOutcome::Deactivated => {
            "Produk memiliki riwayat pesanan sehingga dinonaktifkan, bukan dihapus"
        }
    };
    Ok(MessageBody::json(msg))
}

/// POST /admin/products/:id/image (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> AppResult<Json<ProductDetail>> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        services::upload_product_image(&state, id, data, &content_type).await?;
        return Ok(Json(detail(&state, id, true).await?));
    }
    Err(AppError::BadRequest("Field file wajib diisi".into()))
}

#[instrument(skip(state, payload))]
pub async fn create_variant(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<VariantInput>,
) -> AppResult<(StatusCode, Json<VariantView>)> {
    let fields = payload.into_fields().map_err(AppError::BadRequest)?;
    if repo::find_entry(&state.db, product_id, true).await?.is_none() {
        return Err(AppError::not_found("Produk"));
    }
    let v = repo::insert_variant(&state.db, product_id, &fields)
        .await
        .map_err(|e| services::sku_conflict(e, &fields.sku))?;
    Ok((StatusCode::CREATED, Json(VariantView::from(&v))))
}

#[instrument(skip(state, payload))]
pub async fn update_variant(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VariantInput>,
) -> AppResult<Json<VariantView>> {
    let fields = payload.into_fields().map_err(AppError::BadRequest)?;
    let v = repo::update_variant(&state.db, id, &fields)
        .await
        .map_err(|e| services::sku_conflict(e, &fields.sku))?
        .ok_or_else(|| AppError::not_found("Varian"))?;
    Ok(Json(VariantView::from(&v)))
}

#[instrument(skip(state))]
pub async fn set_stock(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStockRequest>,
) -> AppResult<Json<VariantView>> {
    if payload.stock < 0 {
        return Err(AppError::BadRequest("Stok tidak boleh negatif".into()));
    }
    let v = repo::set_stock(&state.db, id, payload.stock)
        .await?
        .ok_or_else(|| AppError::not_found("Varian"))?;
    tracing::info!(variant_id = %id, stock = v.stock, "stock updated");
    Ok(Json(VariantView::from(&v)))
}

#[instrument(skip(state))]
pub async fn delete_variant(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageBody>> {
    if repo::variant_has_orders(&state.db, id).await? {
        return Err(AppError::Conflict(VARIANT_ORDERED.into()));
    }
    let deleted = repo::delete_variant(&state.db, id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::Conflict(VARIANT_ORDERED.into())
        } else {
            AppError::Internal(e)
        }
    })?;
    if !deleted {
        return Err(AppError::not_found("Varian"));
    }
    Ok(MessageBody::json("Varian berhasil dihapus"))
}
