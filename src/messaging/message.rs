//! # Queue Messages
//!
//! The payload published for every stored change, and the envelope a
//! consumer receives from the queue.

use super::errors::{MessagingError, MessagingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload carried from the ingestion handler to the aggregation workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMessage {
    pub change_id: String,
}

impl ChangeMessage {
    pub fn new(change_id: impl Into<String>) -> Self {
        Self {
            change_id: change_id.into(),
        }
    }

    pub fn to_payload(&self) -> MessagingResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A delivered message that has not been acknowledged yet.
///
/// The payload stays raw JSON so a malformed message can be rejected by the
/// consumer instead of failing the whole batch read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub msg_id: i64,
    /// How many times the queue has handed this message out, this delivery included
    pub read_count: i32,
    pub enqueued_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl ReceivedMessage {
    /// Decode the change id carried by this message
    pub fn change_message(&self) -> MessagingResult<ChangeMessage> {
        let message: ChangeMessage = serde_json::from_value(self.payload.clone())?;
        if message.change_id.is_empty() {
            return Err(MessagingError::message_deserialization(
                "change_id must not be empty",
            ));
        }
        Ok(message)
    }

    pub fn is_redelivery(&self) -> bool {
        self.read_count > 1
    }
}

impl From<pgmq::types::Message<serde_json::Value>> for ReceivedMessage {
    fn from(message: pgmq::types::Message<serde_json::Value>) -> Self {
        Self {
            msg_id: message.msg_id,
            read_count: message.read_ct,
            enqueued_at: message.enqueued_at,
            payload: message.message,
        }
    }
}
