//! Read-only view of the aggregate metrics served by the dashboard.

use crate::constants::aggregation::GLOBAL_STATS_KEY;
use crate::models::StatsRecord;
use crate::store::{StatsStore, StoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsReport {
    pub lead_time_avg_minutes: f64,
    pub change_failure_rate: f64,
    pub mttr_minutes: f64,
    /// Epoch seconds of the last aggregation, zero before the first
    pub updated_at: f64,
}

impl From<Option<StatsRecord>> for StatsReport {
    fn from(record: Option<StatsRecord>) -> Self {
        match record {
            Some(record) => Self {
                lead_time_avg_minutes: record.lead_time_avg_minutes,
                change_failure_rate: record.change_failure_rate,
                mttr_minutes: record.mttr_minutes,
                updated_at: record.updated_at,
            },
            // No change has been aggregated yet
            None => Self::default(),
        }
    }
}

impl StatsReport {
    /// Current global metrics, all zero before the first aggregation
    pub async fn current(stats_store: &dyn StatsStore) -> StoreResult<Self> {
        let record = stats_store.get_by_key(GLOBAL_STATS_KEY).await?;
        Ok(Self::from(record))
    }
}
