//! # Task Queue Contract
//!
//! At-least-once delivery of change ids to competing consumers. A received
//! message stays invisible to other consumers for its visibility timeout;
//! unless it is acknowledged or archived before then, it is delivered again.
//! No ordering is guaranteed across messages.

use super::errors::MessagingResult;
use super::message::{ChangeMessage, ReceivedMessage};
use async_trait::async_trait;

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Create the queue if it does not exist yet
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()>;

    /// Publish a change id, returning the queue's message id
    async fn publish(&self, queue_name: &str, message: &ChangeMessage) -> MessagingResult<i64>;

    /// Receive up to `limit` visible messages, hiding them for
    /// `visibility_timeout_seconds`
    async fn receive(
        &self,
        queue_name: &str,
        visibility_timeout_seconds: i32,
        limit: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>>;

    /// Acknowledge a processed message; it will not be delivered again
    async fn ack(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()>;

    /// Acknowledge a rejected message, keeping a copy for inspection
    async fn archive(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()>;

    async fn health_check(&self) -> bool;
}
