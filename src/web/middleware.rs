use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

use crate::web::state::AppState;

/// Label for requests that matched no route
const UNMATCHED_PATH: &str = "unmatched";

/// Count every request and time it, labelled by its route pattern
pub async fn track_http_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    state
        .metrics
        .record(&method, &path, response.status().as_u16(), started.elapsed());
    response
}
