//! # Web API
//!
//! Axum router for the dashboard: change submission and listing, manual
//! re-enqueue, the stats read endpoint, the health probes and the
//! Prometheus scrape.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use errors::{ApiError, ApiResult};
pub use state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with its middleware stack
pub fn create_app(app_state: AppState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(routes::health_routes())
        .nest("/api", routes::api_routes())
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::track_http_metrics,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        // Outermost so the trace span sees the generated id
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(app_state)
}
