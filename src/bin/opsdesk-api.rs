//! # OpsDesk API Server
//!
//! Serves the dashboard HTTP API. With `--embedded` it also runs the
//! aggregation workers in-process against in-memory stores, which needs no
//! Postgres and keeps nothing across restarts.

use anyhow::Context;
use clap::Parser;
use opsdesk::aggregation::{AggregationWorkerConfig, WorkerPool};
use opsdesk::config::ConfigManager;
use opsdesk::logging::init_structured_logging;
use opsdesk::{bootstrap, web};
use std::path::PathBuf;
use tracing::{info, Instrument};

#[derive(Parser)]
#[command(name = "opsdesk-api")]
#[command(about = "Operations dashboard HTTP API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: $OPSDESK_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Listen address, overrides web.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Run workers in-process on in-memory stores instead of Postgres
    #[arg(long)]
    embedded: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load_from_directory(cli.config_dir)
        .context("failed to load configuration")?;
    let mut config = manager.config().clone();
    if let Some(bind) = cli.bind {
        config.web.bind_address = bind;
    }

    init_structured_logging(&config.telemetry, &config.environment);

    let root_span = tracing::info_span!(
        "opsdesk_api",
        service = %config.telemetry.service_name,
        environment = %config.environment,
        version = %config.telemetry.version,
    );

    run(config, cli.embedded).instrument(root_span).await
}

async fn run(config: opsdesk::OpsDeskConfig, embedded: bool) -> anyhow::Result<()> {
    let system = if embedded {
        bootstrap::in_memory(&config).await?
    } else {
        bootstrap::connect(&config)
            .await
            .context("failed to connect backends")?
    };

    let workers = embedded.then(|| {
        WorkerPool::start(
            config.worker.concurrency,
            system.aggregation_components(),
            AggregationWorkerConfig::from(&config),
            config.worker.shutdown_timeout(),
        )
    });

    let listener = tokio::net::TcpListener::bind(&config.web.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.web.bind_address))?;
    info!(address = %config.web.bind_address, embedded, "OpsDesk API listening");

    axum::serve(listener, web::create_app(system.app_state()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(workers) = workers {
        workers.shutdown().await?;
    }
    system.close().await;

    info!("OpsDesk API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
