use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    AdminOrdersQuery, CancelRequest, CheckoutRequest, MyOrdersQuery, OrderSummaryView, OrderView,
    UpdateStatusRequest,
};
use super::repo::{self, OrderFilter};
use super::repo_types::Order;
use super::services;
use super::status::{Actor, OrderStatus};
use crate::{
    auth::{repo_types::Role, repo_types::Profile, AdminUser, AuthUser},
    error::{AppError, AppResult},
    pagination::{PageParams, Paged},
    reports::{attachment, documents},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_my_orders).post(checkout))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/confirm", post(confirm_received))
        .route("/orders/:id/invoice.pdf", get(invoice_pdf))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(admin_list_orders))
        .route("/admin/orders/:id", get(admin_get_order))
        .route("/admin/orders/:id/status", put(update_status))
}

async fn view(state: &AppState, order: Order, viewer: Actor) -> AppResult<OrderView> {
    let items = repo::items(&state.db, order.id).await?;
    Ok(OrderView::new(order, &items, viewer))
}

/// Loads an order visible to `user_id`: their own, or any when they are an admin.
async fn visible_order(state: &AppState, user_id: Uuid, id: Uuid) -> AppResult<(Order, Actor)> {
    let order = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Pesanan"))?;
    if order.user_id == user_id {
        return Ok((order, Actor::Customer));
    }
    match Profile::role_of(&state.db, user_id).await? {
        Some(Role::Admin) => Ok((order, Actor::Admin)),
        _ => Err(AppError::not_found("Pesanan")),
    }
}

#[instrument(skip(state, req))]
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<OrderView>)> {
    let order = services::checkout(&state, user_id, req).await?;
    Ok((StatusCode::CREATED, Json(view(&state, order, Actor::Customer).await?)))
}

#[instrument(skip(state))]
pub async fn list_my_orders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<MyOrdersQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Paged<OrderSummaryView>>> {
    let filter = OrderFilter {
        user_id: Some(user_id),
        status: q.status,
        q: None,
    };
    let (limit, offset) = page.limit_offset();
    let (rows, total) = repo::list(&state.db, &filter, limit, offset).await?;
    let items = rows.into_iter().map(OrderSummaryView::from).collect();
    Ok(Json(Paged::new(items, page, total)))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    let (order, viewer) = visible_order(&state, user_id, id).await?;
    Ok(Json(view(&state, order, viewer).await?))
}

#[instrument(skip(state, body))]
pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> AppResult<Json<OrderView>> {
    let reason = body.and_then(|Json(b)| b.reason);
    let order = services::change_status(
        &state,
        user_id,
        Actor::Customer,
        id,
        OrderStatus::Dibatalkan,
        reason.as_deref(),
    )
    .await?;
    Ok(Json(view(&state, order, Actor::Customer).await?))
}

#[instrument(skip(state))]
pub async fn confirm_received(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    let order =
        services::change_status(&state, user_id, Actor::Customer, id, OrderStatus::Selesai, None)
            .await?;
    Ok(Json(view(&state, order, Actor::Customer).await?))
}

#[instrument(skip(state))]
pub async fn invoice_pdf(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let (order, _) = visible_order(&state, user_id, id).await?;
    let items = repo::items(&state.db, order.id).await?;
    let buyer = Profile::find_by_id(&state.db, order.user_id).await?;
    let bytes = documents::invoice_pdf(
        &state.config.store_name,
        &order,
        &items,
        buyer.as_ref().map(|p| p.username.as_str()),
    );
    Ok(attachment("application/pdf", &format!("{}.pdf", order.code), bytes))
}

#[instrument(skip(state))]
pub async fn admin_list_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<AdminOrdersQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Paged<OrderSummaryView>>> {
    let filter = OrderFilter {
        user_id: None,
        status: q.status,
        q: q.q.filter(|s| !s.trim().is_empty()),
    };
    let (limit, offset) = page.limit_offset();
    let (rows, total) = repo::list(&state.db, &filter, limit, offset).await?;
    let items = rows.into_iter().map(OrderSummaryView::from).collect();
    Ok(Json(Paged::new(items, page, total)))
}

#[instrument(skip(state))]
pub async fn admin_get_order(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    let order = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Pesanan"))?;
    Ok(Json(view(&state, order, Actor::Admin).await?))
}

#[instrument(skip(state, req))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<OrderView>> {
    let order = services::change_status(
        &state,
        admin_id,
        Actor::Admin,
        id,
        req.status,
        req.reason.as_deref(),
    )
    .await?;
    Ok(Json(view(&state, order, Actor::Admin).await?))
}
