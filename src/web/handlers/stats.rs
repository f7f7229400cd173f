use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::reporting::StatsReport;
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

/// Current global metrics: GET /api/stats
///
/// Zeros until the first change has been aggregated.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsReport>> {
    let report = StatsReport::current(state.stats_store.as_ref()).await?;
    Ok(Json(report))
}

/// Liveness of the API surface: GET /api/ping
pub async fn ping() -> Json<Value> {
    Json(json!({ "ok": true }))
}
