//! # Postgres Stores
//!
//! `PgChangeStore` and `PgStatsStore` share one `sqlx::PgPool`.
//!
//! ## Stats serialization
//!
//! `record_lead_time` runs in a single transaction:
//!
//! 1. `SELECT ... FOR UPDATE` locks the key's row, so concurrent workers
//!    queue up behind the current holder instead of reading a stale average.
//! 2. When no row exists, `INSERT ... ON CONFLICT DO NOTHING` creates it.
//!    A concurrent creator makes the insert wait for its commit and then
//!    affect zero rows; the loser re-reads the committed row with
//!    `FOR UPDATE` and folds its observation in.
//! 3. Commit. The caller acknowledges the queue message only afterwards.

use super::errors::is_unique_violation;
use super::{ChangeStore, StatsStore, StatsUpdate, StoreError, StoreResult};
use crate::database;
use crate::models::{Change, NewChange, StatsRecord};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct PgChangeStore {
    pool: PgPool,
}

impl PgChangeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeStore for PgChangeStore {
    #[instrument(skip(self, new_change), fields(change_id = %new_change.id))]
    async fn insert(&self, new_change: NewChange) -> StoreResult<Change> {
        match Change::create(&self.pool, &new_change).await {
            Ok(change) => Ok(change),
            Err(e) if is_unique_violation(&e) => {
                debug!("Duplicate change id rejected");
                Err(StoreError::conflict("changes", new_change.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Change>> {
        Ok(Change::find_by_id(&self.pool, id).await?)
    }

    async fn list(&self) -> StoreResult<Vec<Change>> {
        Ok(Change::list_all(&self.pool).await?)
    }

    async fn health_check(&self) -> bool {
        match database::health_check(&self.pool).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<StatsRecord>> {
        Ok(StatsRecord::find_by_key(&self.pool, key).await?)
    }

    #[instrument(skip(self), fields(stats_key = %key))]
    async fn record_lead_time(
        &self,
        key: &str,
        lead_time_minutes: f64,
        now: f64,
    ) -> StoreResult<StatsUpdate> {
        let mut tx = self.pool.begin().await?;

        let update = match StatsRecord::find_by_key_for_update(&mut *tx, key).await? {
            Some(mut existing) => {
                existing.observe_lead_time(lead_time_minutes, now);
                existing.save(&mut *tx).await?;
                StatsUpdate {
                    record: existing,
                    created: false,
                }
            }
            None => {
                let initial = StatsRecord::initial(key, lead_time_minutes, now);
                if initial.insert_if_absent(&mut *tx).await? {
                    StatsUpdate {
                        record: initial,
                        created: true,
                    }
                } else {
                    debug!("Stats record created concurrently, folding into committed row");
                    let mut existing = StatsRecord::find_by_key_for_update(&mut *tx, key)
                        .await?
                        .ok_or_else(|| StoreError::not_found("stats", key))?;
                    existing.observe_lead_time(lead_time_minutes, now);
                    existing.save(&mut *tx).await?;
                    StatsUpdate {
                        record: existing,
                        created: false,
                    }
                }
            }
        };

        tx.commit().await?;

        Ok(update)
    }
}
