//! # Worker Pool
//!
//! Runs N competing aggregation workers on tokio tasks. All workers share
//! the stores and the queue; the queue hands each message to one of them at
//! a time and the stats store serializes their updates.

use super::worker::{AggregationComponents, AggregationWorker, AggregationWorkerConfig};
use super::AggregationError;
use futures::future::join_all;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{error, info, warn, Instrument};

pub struct WorkerPool {
    handles: Vec<JoinHandle<Result<(), AggregationError>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawn `concurrency` workers; must be called inside a tokio runtime
    pub fn start(
        concurrency: usize,
        components: AggregationComponents,
        config: AggregationWorkerConfig,
        shutdown_timeout: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = (0..concurrency.max(1))
            .map(|index| {
                let worker = AggregationWorker::new(
                    format!("worker-{index}"),
                    components.clone(),
                    config.clone(),
                );
                let shutdown = shutdown_rx.clone();
                let span = tracing::info_span!("aggregation_worker", worker_index = index);
                tokio::spawn(async move { worker.run(shutdown).await }.instrument(span))
            })
            .collect::<Vec<_>>();

        info!(
            workers = handles.len(),
            queue = %config.queue_name,
            "Aggregation worker pool started"
        );

        Self {
            handles,
            shutdown_tx,
            shutdown_timeout,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Signal every worker to stop after its current message and wait for
    /// them, up to the shutdown timeout. Workers still running after the
    /// timeout are aborted.
    pub async fn shutdown(self) -> Result<(), AggregationError> {
        info!(workers = self.handles.len(), "Stopping aggregation worker pool");

        // Receivers outlive the send only if workers are still running
        let _ = self.shutdown_tx.send(true);

        let abort_handles: Vec<AbortHandle> =
            self.handles.iter().map(JoinHandle::abort_handle).collect();

        let results = match tokio::time::timeout(self.shutdown_timeout, join_all(self.handles)).await
        {
            Ok(results) => results,
            Err(_) => {
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Workers did not stop in time, aborting; in-flight messages will be redelivered"
                );
                for handle in &abort_handles {
                    handle.abort();
                }
                return Ok(());
            }
        };

        let mut first_error = None;
        for result in results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Aggregation worker exited with error");
                    first_error.get_or_insert(e);
                }
                Err(join_error) => {
                    error!(error = %join_error, "Aggregation worker task failed");
                    first_error.get_or_insert(AggregationError::WorkerPanicked(join_error.to_string()));
                }
            }
        }

        info!("Aggregation worker pool stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
