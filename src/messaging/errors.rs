//! # Messaging Error Types
//!
//! Structured error handling for the task queue using thiserror instead of
//! `Box<dyn Error>` patterns.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },
}

impl MessagingError {
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }
}

/// Conversion from serde_json::Error to MessagingError
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;
