//! # System Bootstrap
//!
//! Wires configuration into the shared components used by the API and the
//! worker binaries: pool, migrations, queue, stores and the ingestion handler.

use crate::aggregation::AggregationComponents;
use crate::config::OpsDeskConfig;
use crate::database::{connect_pool, run_migrations};
use crate::error::Result;
use crate::ingestion::IngestionHandler;
use crate::messaging::{InMemoryQueue, PgmqClient, TaskQueue};
use crate::store::{
    ChangeStore, InMemoryChangeStore, InMemoryStatsStore, PgChangeStore, PgStatsStore, StatsStore,
};
use crate::web::AppState;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// The shared handles of one running process
#[derive(Clone)]
pub struct OpsDeskSystem {
    pub config: OpsDeskConfig,
    pub change_store: Arc<dyn ChangeStore>,
    pub stats_store: Arc<dyn StatsStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub ingestion: Arc<IngestionHandler>,
    /// Absent in embedded mode
    pub pool: Option<PgPool>,
}

/// Connect to Postgres, migrate and ensure the change queue exists
pub async fn connect(config: &OpsDeskConfig) -> Result<OpsDeskSystem> {
    config.validate()?;

    let pool = connect_pool(&config.database).await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let queue: Arc<dyn TaskQueue> = Arc::new(PgmqClient::new_with_pool(pool.clone()).await);
    queue.ensure_queue(&config.queue.name).await?;

    let change_store: Arc<dyn ChangeStore> = Arc::new(PgChangeStore::new(pool.clone()));
    let stats_store: Arc<dyn StatsStore> = Arc::new(PgStatsStore::new(pool.clone()));

    info!(
        queue = %config.queue.name,
        environment = %config.environment,
        "Connected to Postgres backends"
    );

    Ok(assemble(config, change_store, stats_store, queue, Some(pool)))
}

/// Single-process mode: every store and the queue live in memory and
/// nothing survives a restart
pub async fn in_memory(config: &OpsDeskConfig) -> Result<OpsDeskSystem> {
    config.validate()?;

    let queue: Arc<dyn TaskQueue> = Arc::new(InMemoryQueue::new());
    queue.ensure_queue(&config.queue.name).await?;

    info!(queue = %config.queue.name, "Using in-memory stores and queue");

    Ok(assemble(
        config,
        Arc::new(InMemoryChangeStore::new()),
        Arc::new(InMemoryStatsStore::new()),
        queue,
        None,
    ))
}

fn assemble(
    config: &OpsDeskConfig,
    change_store: Arc<dyn ChangeStore>,
    stats_store: Arc<dyn StatsStore>,
    queue: Arc<dyn TaskQueue>,
    pool: Option<PgPool>,
) -> OpsDeskSystem {
    let ingestion = Arc::new(IngestionHandler::new(
        change_store.clone(),
        queue.clone(),
        config.queue.name.clone(),
        config.ingestion.publish_retry.clone(),
    ));

    OpsDeskSystem {
        config: config.clone(),
        change_store,
        stats_store,
        queue,
        ingestion,
        pool,
    }
}

impl OpsDeskSystem {
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.ingestion.clone(),
            self.change_store.clone(),
            self.stats_store.clone(),
            self.queue.clone(),
        )
    }

    pub fn aggregation_components(&self) -> AggregationComponents {
        AggregationComponents::new(
            self.change_store.clone(),
            self.stats_store.clone(),
            self.queue.clone(),
        )
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
