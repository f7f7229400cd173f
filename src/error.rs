//! # Error Types
//!
//! Crate-level error that wraps the per-module error enums. Component APIs
//! return their own error types; `OpsDeskError` is what bootstrap and the
//! binaries deal in.

use crate::aggregation::AggregationError;
use crate::config::ConfigurationError;
use crate::ingestion::IngestionError;
use crate::messaging::MessagingError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsDeskError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, OpsDeskError>;
