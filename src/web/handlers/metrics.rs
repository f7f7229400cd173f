//! # Metrics Handler
//!
//! Prometheus scrape endpoint for the API's request metrics.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use tracing::debug;

use crate::web::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metrics endpoint: GET /metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Serving Prometheus metrics");

    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render_prometheus(),
    )
}
