//! # OpsDesk Aggregation Worker
//!
//! Runs a pool of aggregation workers against Postgres until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use opsdesk::aggregation::{AggregationWorkerConfig, WorkerPool};
use opsdesk::bootstrap;
use opsdesk::config::ConfigManager;
use opsdesk::logging::init_structured_logging;
use std::path::PathBuf;
use tracing::{info, Instrument};

#[derive(Parser)]
#[command(name = "opsdesk-worker")]
#[command(about = "Aggregates change lead times into the dashboard stats")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: $OPSDESK_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Number of concurrent workers, overrides worker.concurrency
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load_from_directory(cli.config_dir)
        .context("failed to load configuration")?;
    let mut config = manager.config().clone();
    if let Some(concurrency) = cli.concurrency {
        config.worker.concurrency = concurrency;
    }

    init_structured_logging(&config.telemetry, &config.environment);

    let root_span = tracing::info_span!(
        "opsdesk_worker",
        service = %config.telemetry.service_name,
        environment = %config.environment,
        version = %config.telemetry.version,
    );

    run(config).instrument(root_span).await
}

async fn run(config: opsdesk::OpsDeskConfig) -> anyhow::Result<()> {
    let system = bootstrap::connect(&config)
        .await
        .context("failed to connect backends")?;

    let pool = WorkerPool::start(
        config.worker.concurrency,
        system.aggregation_components(),
        AggregationWorkerConfig::from(&config),
        config.worker.shutdown_timeout(),
    );
    info!(workers = pool.size(), "OpsDesk worker running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    pool.shutdown().await?;
    system.close().await;

    info!("OpsDesk worker stopped");
    Ok(())
}
