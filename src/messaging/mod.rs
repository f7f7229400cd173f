//! # Messaging Module
//!
//! Task queue between the ingestion handler and the aggregation workers:
//! PostgreSQL message queue (pgmq) for deployments, an in-process queue with
//! the same visibility-timeout semantics for tests and embedded runs.

pub mod errors;
pub mod memory;
pub mod message;
pub mod pgmq_client;
pub mod queue;

pub use errors::{MessagingError, MessagingResult};
pub use memory::InMemoryQueue;
pub use message::{ChangeMessage, ReceivedMessage};
pub use pgmq_client::PgmqClient;
pub use queue::TaskQueue;
