//! # Web API Error Types
//!
//! Maps domain failures onto HTTP status codes and a JSON error body of the
//! form `{"error": {"code": ..., "message": ...}}`.

use crate::ingestion::IngestionError;
use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    /// The change is stored; only the hand-off to the queue failed
    #[error("Change '{change_id}' stored but not enqueued")]
    EnqueueFailed { change_id: String },

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::EnqueueFailed { .. } | ApiError::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "validation_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::EnqueueFailed { .. } => "enqueue_failed",
            ApiError::ServiceUnavailable => "service_unavailable",
            ApiError::Internal => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        if let ApiError::EnqueueFailed { change_id } = &self {
            body["change_id"] = json!(change_id);
        }

        (self.status_code(), Json(json!({ "error": body }))).into_response()
    }
}

impl From<IngestionError> for ApiError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Validation { .. } => ApiError::bad_request(err.to_string()),
            IngestionError::Conflict { .. } => ApiError::Conflict {
                message: err.to_string(),
            },
            IngestionError::NotFound { .. } => ApiError::NotFound {
                message: err.to_string(),
            },
            IngestionError::EnqueueFailed { change, .. } => {
                ApiError::EnqueueFailed { change_id: change.id }
            }
            IngestionError::Store(store_error) => ApiError::from(store_error),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "Store failure while serving request");
        if err.is_transient() {
            ApiError::ServiceUnavailable
        } else {
            ApiError::Internal
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MessagingError;
    use crate::models::Change;

    #[test]
    fn test_ingestion_errors_map_to_status_codes() {
        let cases = vec![
            (IngestionError::validation("id", "must not be empty"), StatusCode::BAD_REQUEST),
            (
                IngestionError::Conflict {
                    change_id: "c1".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                IngestionError::NotFound {
                    change_id: "c1".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                IngestionError::Store(StoreError::unavailable("pool closed")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_enqueue_failed_keeps_change_id() {
        let change = Change {
            id: "c1".to_string(),
            title: "deploy X".to_string(),
            status: "OPEN".to_string(),
            created_at: 1_000.0,
        };
        let err = ApiError::from(IngestionError::EnqueueFailed {
            change,
            source: MessagingError::queue_operation("process_change", "send", "connection reset"),
        });

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "enqueue_failed");
        assert!(matches!(err, ApiError::EnqueueFailed { ref change_id } if change_id == "c1"));
    }
}
