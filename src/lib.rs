#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # OpsDesk
//!
//! Backend for an operations dashboard: producers submit change events,
//! the API persists them and hands their ids to a task queue, and a pool of
//! aggregation workers folds each change's lead time into a rolling
//! dashboard record.
//!
//! ## Data Flow
//!
//! ```text
//! POST /api/changes -> IngestionHandler -> ChangeStore (changes)
//!                                       -> TaskQueue (process_change)
//!                                              |
//!                        AggregationWorker <---+
//!                          -> ChangeStore lookup
//!                          -> StatsStore::record_lead_time (serialized per key)
//!                          -> ack
//! GET /api/stats -> StatsReport
//! ```
//!
//! ## Module Organization
//!
//! - [`ingestion`] - Validation, persistence and enqueue of submitted changes
//! - [`aggregation`] - Queue consumers and the rolling lead-time average
//! - [`reporting`] - Read view of the aggregate metrics
//! - [`store`] - Change and stats persistence (Postgres and in-memory)
//! - [`messaging`] - Task queue seam over pgmq, plus an in-memory queue
//! - [`web`] - Axum HTTP API
//! - [`metrics`] - HTTP request counters and latency histograms
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`bootstrap`] - Component wiring for the binaries
//!
//! ## Delivery Semantics
//!
//! Delivery is at-least-once. A change whose stats update commits but whose
//! acknowledgement is lost is aggregated again on redelivery.

pub mod aggregation;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod reporting;
pub mod store;
pub mod web;

pub use aggregation::{
    AggregationComponents, AggregationError, AggregationWorker, AggregationWorkerConfig,
    ProcessingOutcome, RejectionReason, WorkerPool,
};
pub use bootstrap::OpsDeskSystem;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigManager, ConfigurationError, OpsDeskConfig};
pub use error::{OpsDeskError, Result};
pub use ingestion::{ChangeSubmission, IngestionError, IngestionHandler};
pub use messaging::{ChangeMessage, InMemoryQueue, MessagingError, PgmqClient, TaskQueue};
pub use metrics::HttpMetrics;
pub use models::{Change, NewChange, StatsRecord};
pub use reporting::StatsReport;
pub use store::{
    ChangeStore, InMemoryChangeStore, InMemoryStatsStore, PgChangeStore, PgStatsStore, StatsStore,
    StatsUpdate, StoreError,
};
