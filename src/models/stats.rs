//! # Stats Record
//!
//! One row per aggregation key holding the rolling delivery metrics.
//!
//! `change_failure_rate` and `mttr_minutes` are part of the persisted schema
//! but no event type updates them yet: they are written once when the row is
//! created and carried through every later update.

use crate::aggregation::rolling::ewma;
use crate::constants::aggregation::LEAD_TIME_SMOOTHING_FACTOR;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

/// Maps to `stats` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatsRecord {
    pub id: String,
    pub lead_time_avg_minutes: f64,
    pub change_failure_rate: f64,
    pub mttr_minutes: f64,
    /// Seconds since the Unix epoch
    pub updated_at: f64,
}

impl StatsRecord {
    /// First record for a key: the single observation is the average
    pub fn initial(key: &str, lead_time_minutes: f64, now: f64) -> Self {
        Self {
            id: key.to_string(),
            lead_time_avg_minutes: lead_time_minutes,
            change_failure_rate: 0.0,
            mttr_minutes: 0.0,
            updated_at: now,
        }
    }

    /// Fold one lead-time observation into the rolling average.
    ///
    /// `now` is sampled before the row lock is held, so a writer that waited
    /// may carry an older instant than the last commit; `updated_at` never
    /// moves backwards.
    pub fn observe_lead_time(&mut self, lead_time_minutes: f64, now: f64) {
        self.lead_time_avg_minutes = ewma(
            self.lead_time_avg_minutes,
            lead_time_minutes,
            LEAD_TIME_SMOOTHING_FACTOR,
        );
        self.updated_at = self.updated_at.max(now);
    }

    pub async fn find_by_key<'e, E>(executor: E, key: &str) -> Result<Option<StatsRecord>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, StatsRecord>(
            r#"
            SELECT id, lead_time_avg_minutes, change_failure_rate, mttr_minutes, updated_at
            FROM stats
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(executor)
        .await
    }

    /// Read and row-lock the record; must run inside a transaction
    pub async fn find_by_key_for_update<'e, E>(
        executor: E,
        key: &str,
    ) -> Result<Option<StatsRecord>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, StatsRecord>(
            r#"
            SELECT id, lead_time_avg_minutes, change_failure_rate, mttr_minutes, updated_at
            FROM stats
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(key)
        .fetch_optional(executor)
        .await
    }

    /// Insert the record unless a row for the key already exists.
    /// Returns false when another writer created it first.
    pub async fn insert_if_absent<'e, E>(&self, executor: E) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO stats (id, lead_time_avg_minutes, change_failure_rate, mttr_minutes, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&self.id)
        .bind(self.lead_time_avg_minutes)
        .bind(self.change_failure_rate)
        .bind(self.mttr_minutes)
        .bind(self.updated_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Persist the mutable columns of an existing record
    pub async fn save<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE stats
            SET lead_time_avg_minutes = $2,
                change_failure_rate = $3,
                mttr_minutes = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(&self.id)
        .bind(self.lead_time_avg_minutes)
        .bind(self.change_failure_rate)
        .bind(self.mttr_minutes)
        .bind(self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_record_takes_observation_verbatim() {
        let record = StatsRecord::initial("global", 12.5, 1_000.0);

        assert_eq!(record.id, "global");
        assert_eq!(record.lead_time_avg_minutes, 12.5);
        assert_eq!(record.change_failure_rate, 0.0);
        assert_eq!(record.mttr_minutes, 0.0);
        assert_eq!(record.updated_at, 1_000.0);
    }

    #[test]
    fn test_observe_lead_time_keeps_reserved_fields() {
        let mut record = StatsRecord {
            id: "global".to_string(),
            lead_time_avg_minutes: 10.0,
            change_failure_rate: 0.25,
            mttr_minutes: 42.0,
            updated_at: 100.0,
        };

        record.observe_lead_time(20.0, 200.0);

        assert!((record.lead_time_avg_minutes - 12.0).abs() < 1e-9);
        assert_eq!(record.change_failure_rate, 0.25);
        assert_eq!(record.mttr_minutes, 42.0);
        assert_eq!(record.updated_at, 200.0);
    }

    #[test]
    fn test_late_observation_does_not_rewind_updated_at() {
        let mut record = StatsRecord::initial("global", 10.0, 1_000.0);

        record.observe_lead_time(20.0, 1_200.0);
        record.observe_lead_time(30.0, 1_100.0);

        assert_eq!(record.updated_at, 1_200.0);
        // The late observation still counts toward the average
        assert!((record.lead_time_avg_minutes - (0.2 * 30.0 + 0.8 * 12.0)).abs() < 1e-9);
    }
}
