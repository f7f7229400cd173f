//! Shared fixtures for the integration tests: an in-memory harness and
//! store/queue doubles that fail on demand.

#![allow(dead_code)]

pub mod mocks;

use opsdesk::aggregation::{AggregationComponents, AggregationWorker, AggregationWorkerConfig};
use opsdesk::clock::ManualClock;
use opsdesk::config::BackoffConfig;
use opsdesk::constants::queue::PROCESS_CHANGE_QUEUE;
use opsdesk::ingestion::IngestionHandler;
use opsdesk::messaging::{InMemoryQueue, TaskQueue};
use opsdesk::store::{ChangeStore, InMemoryChangeStore, InMemoryStatsStore, StatsStore};
use opsdesk::web::AppState;
use std::sync::Arc;
use std::time::Duration;

pub const QUEUE: &str = PROCESS_CHANGE_QUEUE;

/// Fixed instant the harness clock starts at
pub const START: f64 = 1_700_000_000.0;

/// Retries with no waiting so failure paths stay fast
pub fn fast_retry(max_attempts: u32) -> BackoffConfig {
    BackoffConfig {
        max_attempts,
        base_delay_ms: 0,
        max_delay_ms: 0,
        multiplier: 1.0,
    }
}

pub fn worker_config() -> AggregationWorkerConfig {
    AggregationWorkerConfig {
        poll_interval: Duration::from_millis(5),
        ..AggregationWorkerConfig::default()
    }
}

/// Every component wired against in-memory backends and a manual clock
pub struct Harness {
    pub change_store: Arc<dyn ChangeStore>,
    pub stats_store: Arc<dyn StatsStore>,
    pub queue: Arc<InMemoryQueue>,
    pub clock: Arc<ManualClock>,
    pub ingestion: Arc<IngestionHandler>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_stores(
            Arc::new(InMemoryChangeStore::new()),
            Arc::new(InMemoryStatsStore::new()),
        )
        .await
    }

    pub async fn with_stores(
        change_store: Arc<dyn ChangeStore>,
        stats_store: Arc<dyn StatsStore>,
    ) -> Self {
        let queue = Arc::new(InMemoryQueue::new());
        queue.ensure_queue(QUEUE).await.unwrap();
        let clock = Arc::new(ManualClock::new(START));

        let ingestion = Arc::new(
            IngestionHandler::new(change_store.clone(), queue.clone(), QUEUE, fast_retry(3))
                .with_clock(clock.clone()),
        );

        Self {
            change_store,
            stats_store,
            queue,
            clock,
            ingestion,
        }
    }

    pub fn components(&self) -> AggregationComponents {
        AggregationComponents::new(
            self.change_store.clone(),
            self.stats_store.clone(),
            self.queue.clone(),
        )
        .with_clock(self.clock.clone())
    }

    pub fn worker(&self) -> AggregationWorker {
        self.worker_with(worker_config())
    }

    pub fn worker_with(&self, config: AggregationWorkerConfig) -> AggregationWorker {
        AggregationWorker::new("test-worker", self.components(), config)
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.ingestion.clone(),
            self.change_store.clone(),
            self.stats_store.clone(),
            self.queue.clone(),
        )
    }
}
