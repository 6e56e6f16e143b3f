use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::error;

use crate::metrics::MetricsRegistry;

/// HTTP routes for scraping the exporter.
pub fn router(metrics: MetricsRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(metrics)
}

pub async fn serve(listener: TcpListener, metrics: MetricsRegistry) -> std::io::Result<()> {
    axum::serve(listener, router(metrics)).await
}

async fn metrics_handler(State(metrics): State<MetricsRegistry>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "OK"
}
