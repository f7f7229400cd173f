//! # Health Check Handlers
//!
//! Liveness and readiness probes for load balancers and orchestrators.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::constants::system;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub change_store: bool,
    pub queue: bool,
}

/// GET /health: the process is up
pub async fn basic_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: system::SERVICE_NAME,
        version: system::VERSION,
    })
}

/// GET /ready: the change store and the queue both answer
pub async fn readiness_probe(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let (change_store, queue) =
        tokio::join!(state.change_store.health_check(), state.queue.health_check());
    let ready = change_store && queue;

    if !ready {
        warn!(change_store, queue, "Readiness probe failed");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready,
            change_store,
            queue,
        }),
    )
}
