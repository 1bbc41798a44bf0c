use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{AddItemRequest, CartLineView, CartView, UpdateItemRequest};
use super::repo;
use crate::{
    auth::AuthUser,
    catalog::repo as catalog_repo,
    error::{AppError, AppResult},
    orders::services::MAX_LINE_QUANTITY,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).post(add_item).delete(clear_cart))
        .route("/cart/:variant_id", put(update_item).delete(remove_item))
}

async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let rows = repo::list(&state.db, user_id).await?;
    let mut lines = Vec::with_capacity(rows.len());
    for row in &rows {
        let url = state.image_url(row.image_key.as_deref()).await;
        lines.push(CartLineView::new(row, url));
    }
    Ok(CartView::from_lines(lines))
}

/// Rejects quantities a single order could never hold.
fn check_line_limit(quantity: i32) -> AppResult<()> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "Jumlah per barang maksimal {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

/// Checks that `quantity` of an active product's variant can be held in a cart.
async fn ensure_available(state: &AppState, variant_id: Uuid, quantity: i32) -> AppResult<()> {
    check_line_limit(quantity)?;
    let variant = catalog_repo::find_variant(&state.db, variant_id)
        .await?
        .ok_or_else(|| AppError::not_found("Varian produk"))?;
    if catalog_repo::find_entry(&state.db, variant.product_id, false)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Varian produk"));
    }
    if quantity > variant.stock {
        return Err(AppError::InsufficientStock(variant.sku));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<CartView>> {
    Ok(Json(load_cart(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("Jumlah harus lebih dari 0".into()));
    }
    let current = repo::quantity_of(&state.db, user_id, payload.variant_id).await?;
    let wanted = current.saturating_add(payload.quantity);
    ensure_available(&state, payload.variant_id, wanted).await?;
    repo::set_quantity(&state.db, user_id, payload.variant_id, wanted).await?;
    info!(%user_id, variant_id = %payload.variant_id, quantity = wanted, "cart item added");
    Ok(Json(load_cart(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<CartView>> {
    match payload.quantity {
        q if q < 0 => return Err(AppError::BadRequest("Jumlah tidak boleh negatif".into())),
        0 => {
            repo::remove(&state.db, user_id, variant_id).await?;
        }
        q => {
            ensure_available(&state, variant_id, q).await?;
            repo::set_quantity(&state.db, user_id, variant_id, q).await?;
        }
    }
    Ok(Json(load_cart(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(variant_id): Path<Uuid>,
) -> AppResult<Json<CartView>> {
    if !repo::remove(&state.db, user_id, variant_id).await? {
        return Err(AppError::not_found("Item keranjang"));
    }
    Ok(Json(load_cart(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<CartView>> {
    repo::clear(&state.db, user_id).await?;
    Ok(Json(CartView::from_lines(Vec::new())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_limit_matches_checkout() {
        assert!(check_line_limit(MAX_LINE_QUANTITY).is_ok());
        let err = check_line_limit(MAX_LINE_QUANTITY + 1).err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn oversized_line_rejected_before_db() {
        let state = AppState::fake();
        let err = ensure_available(&state, Uuid::new_v4(), 150)
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Jumlah per barang maksimal 99");
    }
}
