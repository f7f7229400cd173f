//! # Structured Logging Module
//!
//! Environment-aware structured logging for the API and worker processes.
//! Console output is human-readable or JSON; a JSON file copy is written when
//! a log directory is configured.

use chrono::Utc;
use crate::config::TelemetryConfig;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging once per process
pub fn init_structured_logging(telemetry: &TelemetryConfig, environment: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter_directive = log_filter(telemetry);

        let console_layer = if telemetry.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(EnvFilter::new(&filter_directive))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(&filter_directive))
                .boxed()
        };

        let mut guard = None;
        let mut log_path = None;
        let file_layer = telemetry.log_dir.as_ref().and_then(|dir| {
            let log_dir = PathBuf::from(dir);
            if let Err(e) = fs::create_dir_all(&log_dir) {
                eprintln!("Failed to create log directory {}: {e}", log_dir.display());
                return None;
            }

            let file_name = format!(
                "{}.{}.{}.{}.log",
                telemetry.service_name,
                environment,
                process::id(),
                Utc::now().format("%Y%m%d_%H%M%S")
            );
            log_path = Some(log_dir.join(&file_name));
            let (writer, worker_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, file_name));
            guard = Some(worker_guard);

            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(&filter_directive)),
            )
        });

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        // Another subscriber may already be installed (tests, embedding hosts)
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = process::id(),
            service = %telemetry.service_name,
            environment = %environment,
            version = %telemetry.version,
            log_file = ?log_path,
            "Structured logging initialized"
        );

        guard
    });
}

/// `RUST_LOG` wins over the configured level
fn log_filter(telemetry: &TelemetryConfig) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| telemetry.log_level.to_lowercase())
}

/// Log structured data for change ingestion
pub fn log_change_operation(operation: &str, change_id: &str, status: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        change_id = %change_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "CHANGE_OPERATION"
    );
}

/// Log structured data for stats aggregation
pub fn log_stats_operation(
    operation: &str,
    stats_key: &str,
    change_id: &str,
    lead_time_minutes: f64,
    lead_time_avg_minutes: f64,
) {
    tracing::info!(
        operation = %operation,
        stats_key = %stats_key,
        change_id = %change_id,
        lead_time_minutes = lead_time_minutes,
        lead_time_avg_minutes = lead_time_avg_minutes,
        timestamp = %Utc::now().to_rfc3339(),
        "STATS_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
