use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, cart, catalog, notifications, orders, reports, users, wallet};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(catalog::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(wallet::router())
        .merge(notifications::router())
        .merge(users::router())
        .merge(reports::router())
        .route("/health", get(|| async { "ok" }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn status_of(uri: &str) -> StatusCode {
        let app = build_app(AppState::fake());
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_is_nested_under_api_prefix() {
        assert_eq!(status_of("/api/v1/health").await, StatusCode::OK);
        assert_eq!(status_of("/health").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_routes_reject_anonymous_requests() {
        for uri in [
            "/api/v1/me",
            "/api/v1/cart",
            "/api/v1/orders",
            "/api/v1/wallet",
            "/api/v1/notifications",
            "/api/v1/admin/users",
            "/api/v1/admin/reports/summary",
        ] {
            assert_eq!(status_of(uri).await, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
