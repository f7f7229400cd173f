use super::handlers;
use super::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Probes and the metrics scrape, never behind any auth or prefix
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .route("/ready", get(handlers::health::readiness_probe))
        .route("/metrics", get(handlers::metrics::prometheus_metrics))
}

/// Mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/changes",
            post(handlers::changes::create_change).get(handlers::changes::list_changes),
        )
        .route(
            "/changes/{change_id}/enqueue",
            post(handlers::changes::enqueue_change),
        )
        .route("/stats", get(handlers::stats::get_stats))
        .route("/ping", get(handlers::stats::ping))
}
