//! # Change Handlers
//!
//! Submission, listing and manual re-enqueue of change events.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::ingestion::ChangeSubmission;
use crate::models::Change;
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub change_id: String,
    pub msg_id: i64,
}

/// Submit a change: POST /api/changes
///
/// Responds with the stored change once it is persisted and enqueued.
pub async fn create_change(
    State(state): State<AppState>,
    payload: Result<Json<ChangeSubmission>, JsonRejection>,
) -> ApiResult<Json<Change>> {
    let Json(submission) = payload?;
    debug!(change_id = %submission.id, "Received change submission");

    let change = state.ingestion.submit(submission).await?;
    Ok(Json(change))
}

/// List stored changes: GET /api/changes
pub async fn list_changes(State(state): State<AppState>) -> ApiResult<Json<Vec<Change>>> {
    let changes = state.ingestion.list().await?;
    Ok(Json(changes))
}

/// Hand a stored change to the queue again: POST /api/changes/{change_id}/enqueue
pub async fn enqueue_change(
    State(state): State<AppState>,
    Path(change_id): Path<String>,
) -> ApiResult<(StatusCode, Json<EnqueueResponse>)> {
    let msg_id = state.ingestion.republish(&change_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse { change_id, msg_id }),
    ))
}
