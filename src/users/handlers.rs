use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateUserRequest, SetRoleRequest, UserListQuery, UserView};
use super::{repo, services};
use crate::{
    auth::{
        services::{create_account, AccountInput},
        AdminUser,
    },
    error::{AppError, AppResult, MessageBody},
    pagination::{PageParams, Paged},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/:id", get(get_user).delete(delete_user))
        .route("/admin/users/:id/role", put(set_role))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<UserListQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Paged<UserView>>> {
    let (limit, offset) = page.limit_offset();
    let (rows, total) = repo::list(&state.db, q.q.as_deref(), q.role, limit, offset).await?;
    let items = rows.into_iter().map(UserView::from).collect();
    Ok(Json(Paged::new(items, page, total)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserView>> {
    let row = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Pengguna"))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username, role = ?payload.role))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    let profile = create_account(
        &state.db,
        AccountInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
            role: payload.role,
        },
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(UserView {
            profile: profile.into(),
            order_count: 0,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<UserView>> {
    services::set_role(&state, admin_id, id, req.role).await?;
    let row = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Pengguna"))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageBody>> {
    services::delete_user(&state, admin_id, id).await?;
    Ok(MessageBody::json("Pengguna dihapus"))
}
