//! # PostgreSQL Message Queue Client (pgmq-rs)
//!
//! `TaskQueue` implementation on the pgmq-rs crate. Queues live in the same
//! database as the change and stats tables, so the client can share their
//! connection pool.

use super::errors::{MessagingError, MessagingResult};
use super::message::{ChangeMessage, ReceivedMessage};
use super::queue::TaskQueue;
use crate::database;
use async_trait::async_trait;
use pgmq::PGMQueue;
use tracing::{debug, info, warn};

/// pgmq-rs based message queue client
#[derive(Debug, Clone)]
pub struct PgmqClient {
    pgmq: PGMQueue,
}

impl PgmqClient {
    /// Create new pgmq client using existing connection pool
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        debug!("Creating pgmq client with shared connection pool");

        let pgmq = PGMQueue::new_with_pool(pool).await;

        Self { pgmq }
    }

    /// Get reference to underlying connection pool
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pgmq.connection
    }
}

#[async_trait]
impl TaskQueue for PgmqClient {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        debug!(queue = queue_name, "Creating queue");

        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))?;

        info!(queue = queue_name, "Queue ready");
        Ok(())
    }

    async fn publish(&self, queue_name: &str, message: &ChangeMessage) -> MessagingResult<i64> {
        let payload = message.to_payload()?;

        let message_id = self
            .pgmq
            .send(queue_name, &payload)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e.to_string()))?;

        debug!(
            queue = queue_name,
            msg_id = message_id,
            change_id = %message.change_id,
            "Message sent"
        );
        Ok(message_id)
    }

    async fn receive(
        &self,
        queue_name: &str,
        visibility_timeout_seconds: i32,
        limit: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>> {
        let messages = self
            .pgmq
            .read_batch::<serde_json::Value>(queue_name, Some(visibility_timeout_seconds), limit)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?
            .unwrap_or_default();

        if !messages.is_empty() {
            debug!(queue = queue_name, count = messages.len(), "Read messages");
        }

        Ok(messages.into_iter().map(ReceivedMessage::from).collect())
    }

    async fn ack(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        self.pgmq
            .delete(queue_name, msg_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e.to_string()))?;

        debug!(queue = queue_name, msg_id = msg_id, "Message deleted");
        Ok(())
    }

    async fn archive(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        self.pgmq
            .archive(queue_name, msg_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "archive", e.to_string()))?;

        debug!(queue = queue_name, msg_id = msg_id, "Message archived");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        match database::health_check(self.pool()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Queue health check failed");
                false
            }
        }
    }
}
