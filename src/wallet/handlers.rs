use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::repo::{self, WalletTransaction};
use super::services;
use crate::{
    auth::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    state::AppState,
};

const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub balance: i64,
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    /// Signed Rupiah; positive tops up, negative deducts.
    pub amount: i64,
    pub note: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/admin/users/:id/wallet", get(admin_get_wallet).post(adjust_wallet))
}

async fn load_wallet(state: &AppState, user_id: Uuid) -> AppResult<Option<WalletView>> {
    let Some(balance) = repo::balance(&state.db, user_id).await? else {
        return Ok(None);
    };
    let transactions = repo::list_transactions(&state.db, user_id, HISTORY_LIMIT).await?;
    Ok(Some(WalletView {
        balance,
        transactions,
    }))
}

#[instrument(skip(state))]
pub async fn get_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<WalletView>> {
    load_wallet(&state, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Akun tidak ditemukan".into()))
}

#[instrument(skip(state))]
pub async fn admin_get_wallet(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<WalletView>> {
    load_wallet(&state, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Pengguna"))
}

#[instrument(skip(state, req), fields(amount = req.amount))]
pub async fn adjust_wallet(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AdjustRequest>,
) -> AppResult<Json<WalletView>> {
    let note = req.note.as_deref().map(str::trim).filter(|s| !s.is_empty());
    services::adjust(&state, admin_id, user_id, req.amount, note).await?;
    load_wallet(&state, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Pengguna"))
}
