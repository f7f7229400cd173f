//! # Storage Seams
//!
//! Traits for the change store and the stats store, with a Postgres
//! implementation for deployments and an in-memory one for tests and the
//! embedded single-process mode.
//!
//! The stats store owns the serialization guarantee for the shared
//! aggregation row: `record_lead_time` is a single read-modify-write that
//! never loses a concurrent observation.

pub mod errors;
pub mod memory;
pub mod postgres;

use crate::models::{Change, NewChange, StatsRecord};
use async_trait::async_trait;

pub use errors::{StoreError, StoreResult};
pub use memory::{InMemoryChangeStore, InMemoryStatsStore};
pub use postgres::{PgChangeStore, PgStatsStore};

/// Durable record of submitted change events
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// Persist a new change; a duplicate id fails with `StoreError::Conflict`
    async fn insert(&self, new_change: NewChange) -> StoreResult<Change>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Change>>;

    async fn list(&self) -> StoreResult<Vec<Change>>;

    async fn health_check(&self) -> bool;
}

/// Result of folding one observation into a stats record
#[derive(Debug, Clone, PartialEq)]
pub struct StatsUpdate {
    pub record: StatsRecord,
    /// True when this update created the record
    pub created: bool,
}

/// Durable rolling metrics, one record per aggregation key
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<StatsRecord>>;

    /// Create the record from this observation or fold it into the existing
    /// average, serialized against every other writer of the same key
    async fn record_lead_time(
        &self,
        key: &str,
        lead_time_minutes: f64,
        now: f64,
    ) -> StoreResult<StatsUpdate>;
}
