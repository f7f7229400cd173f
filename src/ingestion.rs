//! # Ingestion Handler
//!
//! Validates and persists an incoming change, then publishes its id to the
//! task queue for aggregation.
//!
//! ## Partial failure
//!
//! The store write and the queue publish are two separate systems. When the
//! write succeeds and every publish attempt fails, the change stays stored and
//! the caller receives `IngestionError::EnqueueFailed` carrying the stored
//! change. Nothing is rolled back; the change can be handed to the queue
//! again with [`IngestionHandler::republish`].

use crate::clock::{Clock, SystemClock};
use crate::config::BackoffConfig;
use crate::constants::change_limits::{
    DEFAULT_STATUS, MAX_ID_LENGTH, MAX_STATUS_LENGTH, MAX_TITLE_LENGTH,
};
use crate::logging::log_change_operation;
use crate::messaging::{ChangeMessage, MessagingError, TaskQueue};
use crate::models::{Change, NewChange};
use crate::store::{ChangeStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, instrument, warn};

/// A candidate change as submitted by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSubmission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Zero or absent means "stamp with the current time"
    #[serde(default)]
    pub created_at: Option<f64>,
}

impl ChangeSubmission {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: None,
            created_at: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_created_at(mut self, created_at: f64) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Invalid change {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Change '{change_id}' already exists")]
    Conflict { change_id: String },

    #[error("Change '{change_id}' not found")]
    NotFound { change_id: String },

    #[error("Change '{}' stored but not enqueued: {source}", .change.id)]
    EnqueueFailed {
        change: Change,
        #[source]
        source: MessagingError,
    },

    #[error("Change store failure: {0}")]
    Store(#[source] StoreError),
}

impl IngestionError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for IngestionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { id, .. } => IngestionError::Conflict { change_id: id },
            other => IngestionError::Store(other),
        }
    }
}

pub struct IngestionHandler {
    change_store: Arc<dyn ChangeStore>,
    queue: Arc<dyn TaskQueue>,
    clock: Arc<dyn Clock>,
    queue_name: String,
    publish_retry: BackoffConfig,
}

impl IngestionHandler {
    pub fn new(
        change_store: Arc<dyn ChangeStore>,
        queue: Arc<dyn TaskQueue>,
        queue_name: impl Into<String>,
        publish_retry: BackoffConfig,
    ) -> Self {
        Self {
            change_store,
            queue,
            clock: Arc::new(SystemClock),
            queue_name: queue_name.into(),
            publish_retry,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate, persist and enqueue one change
    #[instrument(skip(self, submission), fields(change_id = %submission.id))]
    pub async fn submit(&self, submission: ChangeSubmission) -> Result<Change, IngestionError> {
        let new_change = self.prepare(submission)?;

        let change = self.change_store.insert(new_change).await.map_err(|e| {
            if matches!(e, StoreError::Conflict { .. }) {
                warn!(error = %e, "Rejected duplicate change id");
            }
            IngestionError::from(e)
        })?;

        match self.publish_with_retry(&change.id).await {
            Ok(msg_id) => {
                log_change_operation(
                    "submit",
                    &change.id,
                    "enqueued",
                    Some(format!("msg_id={msg_id}").as_str()),
                );
                Ok(change)
            }
            Err(source) => {
                error!(
                    change_id = %change.id,
                    queue = %self.queue_name,
                    error = %source,
                    "Change stored but could not be enqueued"
                );
                Err(IngestionError::EnqueueFailed { change, source })
            }
        }
    }

    /// Publish an already stored change again
    #[instrument(skip(self))]
    pub async fn republish(&self, change_id: &str) -> Result<i64, IngestionError> {
        let change = self
            .change_store
            .get_by_id(change_id)
            .await?
            .ok_or_else(|| IngestionError::NotFound {
                change_id: change_id.to_string(),
            })?;

        let msg_id = self
            .publish_with_retry(&change.id)
            .await
            .map_err(|source| IngestionError::EnqueueFailed {
                change: change.clone(),
                source,
            })?;

        log_change_operation(
            "republish",
            &change.id,
            "enqueued",
            Some(format!("msg_id={msg_id}").as_str()),
        );
        Ok(msg_id)
    }

    pub async fn list(&self) -> Result<Vec<Change>, IngestionError> {
        Ok(self.change_store.list().await?)
    }

    /// Validate a submission and fill in server-side defaults
    fn prepare(&self, submission: ChangeSubmission) -> Result<NewChange, IngestionError> {
        validate_text("id", &submission.id, MAX_ID_LENGTH)?;
        validate_text("title", &submission.title, MAX_TITLE_LENGTH)?;

        let status = match submission.status {
            Some(status) => {
                validate_text("status", &status, MAX_STATUS_LENGTH)?;
                status
            }
            None => DEFAULT_STATUS.to_string(),
        };

        let created_at = match submission.created_at {
            None => self.clock.now_epoch_seconds(),
            Some(ts) if ts == 0.0 => self.clock.now_epoch_seconds(),
            Some(ts) if !ts.is_finite() || ts < 0.0 => {
                return Err(IngestionError::validation(
                    "created_at",
                    "must be a non-negative epoch timestamp",
                ))
            }
            Some(ts) => ts,
        };

        Ok(NewChange {
            id: submission.id,
            title: submission.title,
            status,
            created_at,
        })
    }

    async fn publish_with_retry(&self, change_id: &str) -> Result<i64, MessagingError> {
        let message = ChangeMessage::new(change_id);
        let max_attempts = self.publish_retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.queue.publish(&self.queue_name, &message).await {
                Ok(msg_id) => return Ok(msg_id),
                Err(e) if attempt < max_attempts => {
                    let delay = self.publish_retry.delay_for_attempt(attempt);
                    warn!(
                        change_id = change_id,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn validate_text(field: &str, value: &str, max_length: usize) -> Result<(), IngestionError> {
    if value.trim().is_empty() {
        return Err(IngestionError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max_length {
        return Err(IngestionError::validation(
            field,
            format!("must be at most {max_length} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::OpsDeskConfig;
    use crate::messaging::InMemoryQueue;
    use crate::store::InMemoryChangeStore;

    const QUEUE: &str = "process_change";

    async fn handler_at(now: f64) -> IngestionHandler {
        let queue = Arc::new(InMemoryQueue::new());
        queue.ensure_queue(QUEUE).await.unwrap();
        IngestionHandler::new(
            Arc::new(InMemoryChangeStore::new()),
            queue,
            QUEUE,
            OpsDeskConfig::default().ingestion.publish_retry,
        )
        .with_clock(Arc::new(ManualClock::new(now)))
    }

    #[tokio::test]
    async fn test_zero_created_at_is_stamped() {
        let handler = handler_at(1_700_000_000.0).await;

        let change = handler
            .submit(ChangeSubmission::new("c1", "deploy X").with_created_at(0.0))
            .await
            .unwrap();

        assert_eq!(change.created_at, 1_700_000_000.0);
        assert_eq!(change.status, "OPEN");
    }

    #[tokio::test]
    async fn test_supplied_created_at_and_status_are_kept() {
        let handler = handler_at(1_700_000_000.0).await;

        let change = handler
            .submit(
                ChangeSubmission::new("c1", "deploy X")
                    .with_status("MERGED")
                    .with_created_at(1_600_000_000.0),
            )
            .await
            .unwrap();

        assert_eq!(change.created_at, 1_600_000_000.0);
        assert_eq!(change.status, "MERGED");
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_fields() {
        let handler = handler_at(1_000.0).await;

        let cases = vec![
            ChangeSubmission::new("", "title"),
            ChangeSubmission::new("c1", "   "),
            ChangeSubmission::new("x".repeat(65), "title"),
            ChangeSubmission::new("c1", "t".repeat(257)),
            ChangeSubmission::new("c1", "title").with_status("s".repeat(33)),
            ChangeSubmission::new("c1", "title").with_created_at(-5.0),
            ChangeSubmission::new("c1", "title").with_created_at(f64::NAN),
        ];

        for submission in cases {
            let result = handler.submit(submission.clone()).await;
            assert!(
                matches!(result, Err(IngestionError::Validation { .. })),
                "expected validation error for {submission:?}"
            );
        }
        assert!(handler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bounds_are_inclusive() {
        let handler = handler_at(1_000.0).await;

        let change = handler
            .submit(ChangeSubmission::new("x".repeat(64), "t".repeat(256)).with_status("s".repeat(32)))
            .await
            .unwrap();

        assert_eq!(change.id.len(), 64);
    }

    #[tokio::test]
    async fn test_republish_unknown_change_is_not_found() {
        let handler = handler_at(1_000.0).await;

        let result = handler.republish("missing").await;
        assert!(matches!(result, Err(IngestionError::NotFound { .. })));
    }

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err = IngestionError::from(StoreError::conflict("changes", "c1"));
        assert!(matches!(err, IngestionError::Conflict { ref change_id } if change_id == "c1"));

        let err = IngestionError::from(StoreError::unavailable("down"));
        assert!(matches!(err, IngestionError::Store(_)));
    }
}
