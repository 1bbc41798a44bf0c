use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::repo::{self, Notification};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult, MessageBody},
    state::AppState,
};

const LIST_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(
        repo::list(&state.db, user_id, q.unread_only, LIST_LIMIT).await?,
    ))
}

#[instrument(skip(state))]
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UnreadCount>> {
    Ok(Json(UnreadCount {
        unread: repo::unread_count(&state.db, user_id).await?,
    }))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageBody>> {
    if !repo::mark_read(&state.db, user_id, id).await? {
        return Err(AppError::not_found("Notifikasi"));
    }
    Ok(MessageBody::json("Notifikasi ditandai sudah dibaca"))
}

#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MessageBody>> {
    let n = repo::mark_all_read(&state.db, user_id).await?;
    Ok(MessageBody::json(format!("{n} notifikasi ditandai sudah dibaca")))
}
