//! In-memory stores with the same contracts as the Postgres ones.

use super::{ChangeStore, StatsStore, StatsUpdate, StoreError, StoreResult};
use crate::models::{Change, NewChange, StatsRecord};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct InMemoryChangeStore {
    changes: DashMap<String, Change>,
}

impl InMemoryChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[async_trait]
impl ChangeStore for InMemoryChangeStore {
    async fn insert(&self, new_change: NewChange) -> StoreResult<Change> {
        match self.changes.entry(new_change.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::conflict("changes", new_change.id)),
            Entry::Vacant(slot) => {
                let change = Change::from(new_change);
                slot.insert(change.clone());
                Ok(change)
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Change>> {
        Ok(self.changes.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> StoreResult<Vec<Change>> {
        let mut changes: Vec<Change> = self
            .changes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        changes.sort_by(|a, b| {
            a.created_at
                .total_cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(changes)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// The mutex is held for the whole read-modify-write of a key
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    records: Mutex<HashMap<String, StatsRecord>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, replacing any existing one for the same key
    pub fn with_record(self, record: StatsRecord) -> Self {
        self.records.lock().insert(record.id.clone(), record);
        self
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<StatsRecord>> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn record_lead_time(
        &self,
        key: &str,
        lead_time_minutes: f64,
        now: f64,
    ) -> StoreResult<StatsUpdate> {
        let mut records = self.records.lock();
        let update = match records.get_mut(key) {
            Some(existing) => {
                existing.observe_lead_time(lead_time_minutes, now);
                StatsUpdate {
                    record: existing.clone(),
                    created: false,
                }
            }
            None => {
                let initial = StatsRecord::initial(key, lead_time_minutes, now);
                records.insert(key.to_string(), initial.clone());
                StatsUpdate {
                    record: initial,
                    created: true,
                }
            }
        };
        Ok(update)
    }
}
