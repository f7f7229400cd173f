use crate::ingestion::IngestionHandler;
use crate::messaging::TaskQueue;
use crate::metrics::HttpMetrics;
use crate::store::{ChangeStore, StatsStore};
use std::sync::Arc;

/// Shared handles for every request handler
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionHandler>,
    pub change_store: Arc<dyn ChangeStore>,
    pub stats_store: Arc<dyn StatsStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    pub fn new(
        ingestion: Arc<IngestionHandler>,
        change_store: Arc<dyn ChangeStore>,
        stats_store: Arc<dyn StatsStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            ingestion,
            change_store,
            stats_store,
            queue,
            metrics: Arc::new(HttpMetrics::new()),
        }
    }
}
