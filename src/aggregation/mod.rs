//! # Aggregation
//!
//! Consumes change ids from the task queue and folds each change's lead time
//! into the shared stats record.
//!
//! ## Message lifecycle
//!
//! ```text
//! Receive -> Lookup Change -> Compute lead time -> Record in stats store -> Ack -> Done
//!                 |                                          |
//!                 +-- missing -> Archive -> Rejected         +-- store error -> (no ack, redelivered)
//! ```
//!
//! The retry boundary is the queue: a transient store failure leaves the
//! message unacknowledged and its visibility timeout brings it back. There
//! is no in-process retry loop.
//!
//! ## Redelivery
//!
//! A worker that commits the stats update and then fails to acknowledge
//! (crash, queue outage) will see the message again and fold the same change
//! in a second time. That double count is the accepted cost of at-least-once
//! delivery; processed messages are not deduplicated.

pub mod rolling;
pub mod worker;
pub mod worker_pool;

use crate::messaging::MessagingError;
use crate::store::StoreError;
use thiserror::Error;

pub use worker::{
    AggregationComponents, AggregationWorker, AggregationWorkerConfig, ProcessingOutcome,
    RejectionReason,
};
pub use worker_pool::WorkerPool;

#[derive(Error, Debug)]
pub enum AggregationError {
    /// Store I/O failed; the message stays unacknowledged for redelivery
    #[error("Transient store failure for change '{change_id}': {source}")]
    TransientStoreFailure {
        change_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Queue failure: {0}")]
    Queue(#[from] MessagingError),

    #[error("Worker task failed: {0}")]
    WorkerPanicked(String),
}
