use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::services::{self, Period, ReportQuery, SummaryResponse};
use super::{attachment, documents, repo};
use crate::{auth::AdminUser, error::AppResult, state::AppState};

const CSV: &str = "text/csv; charset=utf-8";
const PDF: &str = "application/pdf";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/reports/summary", get(summary))
        .route("/admin/reports/orders.csv", get(orders_csv))
        .route("/admin/reports/orders.pdf", get(orders_pdf))
        .route("/admin/reports/products.csv", get(products_csv))
}

#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<ReportQuery>,
) -> AppResult<Json<SummaryResponse>> {
    let period = Period::from_query(&q)?;
    Ok(Json(services::summary(&state, period).await?))
}

#[instrument(skip(state))]
pub async fn orders_csv(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Query(q): Query<ReportQuery>,
) -> AppResult<Response> {
    let period = Period::from_query(&q)?;
    let rows = repo::order_rows(&state.db, &period.range(q.status)).await?;
    info!(%admin_id, rows = rows.len(), "orders csv exported");
    Ok(attachment(
        CSV,
        &format!("laporan-pesanan_{}.csv", period.slug()),
        documents::orders_csv(&rows),
    ))
}

#[instrument(skip(state))]
pub async fn orders_pdf(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Query(q): Query<ReportQuery>,
) -> AppResult<Response> {
    let period = Period::from_query(&q)?;
    let rows = repo::order_rows(&state.db, &period.range(q.status)).await?;
    let mut label = period.label();
    if let Some(status) = q.status {
        label.push_str(&format!(" ({status})"));
    }
    info!(%admin_id, rows = rows.len(), "orders pdf exported");
    Ok(attachment(
        PDF,
        &format!("laporan-pesanan_{}.pdf", period.slug()),
        documents::orders_pdf(&state.config.store_name, &label, &rows),
    ))
}

#[instrument(skip(state))]
pub async fn products_csv(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
) -> AppResult<Response> {
    let rows = repo::inventory(&state.db).await?;
    info!(%admin_id, rows = rows.len(), "inventory csv exported");
    Ok(attachment(CSV, "inventaris-produk.csv", documents::products_csv(&rows)))
}
