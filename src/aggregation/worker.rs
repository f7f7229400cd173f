//! # Aggregation Worker
//!
//! One competing consumer of the change queue. Each received message runs
//! through lookup, lead-time computation and the serialized stats update;
//! the message is acknowledged strictly after the update commits.

use super::rolling::lead_time_minutes;
use super::AggregationError;
use crate::clock::{Clock, SystemClock};
use crate::config::OpsDeskConfig;
use crate::constants::aggregation::GLOBAL_STATS_KEY;
use crate::constants::queue;
use crate::logging::{log_error, log_stats_operation};
use crate::messaging::{ReceivedMessage, TaskQueue};
use crate::store::{ChangeStore, StatsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Terminal outcome of one message
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    /// Stats updated and message acknowledged
    Done {
        change_id: String,
        lead_time_minutes: f64,
        lead_time_avg_minutes: f64,
    },
    /// Message archived without touching the stats record
    Rejected(RejectionReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The referenced change does not exist; redelivery cannot fix that
    ChangeNotFound { change_id: String },
    /// The payload does not carry a change id
    MalformedMessage { reason: String },
    /// Delivered more often than `worker.max_delivery_attempts`
    DeliveryAttemptsExceeded { read_count: i32 },
}

#[derive(Debug, Clone)]
pub struct AggregationWorkerConfig {
    pub queue_name: String,
    pub stats_key: String,
    pub visibility_timeout_seconds: i32,
    pub batch_size: i32,
    pub poll_interval: Duration,
    pub max_delivery_attempts: Option<i32>,
}

impl Default for AggregationWorkerConfig {
    fn default() -> Self {
        Self {
            queue_name: queue::PROCESS_CHANGE_QUEUE.to_string(),
            stats_key: GLOBAL_STATS_KEY.to_string(),
            visibility_timeout_seconds: queue::DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
            batch_size: queue::DEFAULT_BATCH_SIZE,
            poll_interval: Duration::from_millis(queue::DEFAULT_POLL_INTERVAL_MS),
            max_delivery_attempts: None,
        }
    }
}

impl From<&OpsDeskConfig> for AggregationWorkerConfig {
    fn from(config: &OpsDeskConfig) -> Self {
        Self {
            queue_name: config.queue.name.clone(),
            stats_key: GLOBAL_STATS_KEY.to_string(),
            visibility_timeout_seconds: config.queue.visibility_timeout_seconds,
            batch_size: config.queue.batch_size,
            poll_interval: config.queue.poll_interval(),
            max_delivery_attempts: config.worker.max_delivery_attempts,
        }
    }
}

/// Shared collaborators of every worker in a pool
#[derive(Clone)]
pub struct AggregationComponents {
    pub change_store: Arc<dyn ChangeStore>,
    pub stats_store: Arc<dyn StatsStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub clock: Arc<dyn Clock>,
}

impl AggregationComponents {
    pub fn new(
        change_store: Arc<dyn ChangeStore>,
        stats_store: Arc<dyn StatsStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            change_store,
            stats_store,
            queue,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

pub struct AggregationWorker {
    worker_id: String,
    components: AggregationComponents,
    config: AggregationWorkerConfig,
}

impl AggregationWorker {
    pub fn new(
        worker_id: impl Into<String>,
        components: AggregationComponents,
        config: AggregationWorkerConfig,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            components,
            config,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Poll the queue until the shutdown signal flips to true.
    /// Shutdown is observed between messages, never in the middle of one.
    #[instrument(skip(self, shutdown), fields(worker_id = %self.worker_id))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), AggregationError> {
        info!(
            queue = %self.config.queue_name,
            batch_size = self.config.batch_size,
            "Starting aggregation worker"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.process_batch().await {
                Ok(handled) => handled == 0,
                Err(e) => {
                    error!(error = %e, "Error in aggregation batch");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!("Aggregation worker stopped");
        Ok(())
    }

    /// Receive one batch and process each message. Returns how many messages
    /// reached a terminal outcome; messages hit by a transient store failure
    /// are left for redelivery and not counted.
    pub async fn process_batch(&self) -> Result<usize, AggregationError> {
        let messages = self
            .components
            .queue
            .receive(
                &self.config.queue_name,
                self.config.visibility_timeout_seconds,
                self.config.batch_size,
            )
            .await?;

        if messages.is_empty() {
            return Ok(0);
        }

        let mut handled = 0;
        for message in &messages {
            match self.process_message(message).await {
                Ok(_) => handled += 1,
                Err(e) => {
                    warn!(
                        msg_id = message.msg_id,
                        error = %e,
                        "Message left unacknowledged for redelivery"
                    );
                }
            }
        }

        debug!(
            handled = handled,
            received = messages.len(),
            "Completed aggregation batch"
        );
        Ok(handled)
    }

    /// Run one message to a terminal outcome.
    ///
    /// `Err(TransientStoreFailure)` means nothing was acknowledged.
    #[instrument(skip(self, message), fields(worker_id = %self.worker_id, msg_id = message.msg_id))]
    pub async fn process_message(
        &self,
        message: &ReceivedMessage,
    ) -> Result<ProcessingOutcome, AggregationError> {
        if let Some(max_attempts) = self.config.max_delivery_attempts {
            if message.read_count > max_attempts {
                error!(
                    read_count = message.read_count,
                    max_attempts = max_attempts,
                    "Message exceeded delivery attempts, archiving"
                );
                self.archive(message).await;
                return Ok(ProcessingOutcome::Rejected(
                    RejectionReason::DeliveryAttemptsExceeded {
                        read_count: message.read_count,
                    },
                ));
            }
        }

        let change_id = match message.change_message() {
            Ok(decoded) => decoded.change_id,
            Err(e) => {
                warn!(error = %e, payload = %message.payload, "Malformed queue message, archiving");
                self.archive(message).await;
                return Ok(ProcessingOutcome::Rejected(
                    RejectionReason::MalformedMessage {
                        reason: e.to_string(),
                    },
                ));
            }
        };

        if message.is_redelivery() {
            debug!(
                change_id = %change_id,
                read_count = message.read_count,
                "Processing redelivered message"
            );
        }

        let change = self
            .components
            .change_store
            .get_by_id(&change_id)
            .await
            .map_err(|source| AggregationError::TransientStoreFailure {
                change_id: change_id.clone(),
                source,
            })?;

        let Some(change) = change else {
            log_error(
                "aggregation_worker",
                "lookup_change",
                "change referenced by queue message does not exist",
                Some(change_id.as_str()),
            );
            self.archive(message).await;
            return Ok(ProcessingOutcome::Rejected(
                RejectionReason::ChangeNotFound { change_id },
            ));
        };

        let now = self.components.clock.now_epoch_seconds();
        let lead_time = lead_time_minutes(now, change.created_at);

        let update = self
            .components
            .stats_store
            .record_lead_time(&self.config.stats_key, lead_time, now)
            .await
            .map_err(|source| AggregationError::TransientStoreFailure {
                change_id: change_id.clone(),
                source,
            })?;

        log_stats_operation(
            if update.created { "create" } else { "update" },
            &self.config.stats_key,
            &change_id,
            lead_time,
            update.record.lead_time_avg_minutes,
        );

        if let Err(e) = self
            .components
            .queue
            .ack(&self.config.queue_name, message.msg_id)
            .await
        {
            // Committed but not acknowledged: redelivery will count this change again
            warn!(
                change_id = %change_id,
                error = %e,
                "Failed to acknowledge processed message"
            );
        }

        Ok(ProcessingOutcome::Done {
            change_id,
            lead_time_minutes: lead_time,
            lead_time_avg_minutes: update.record.lead_time_avg_minutes,
        })
    }

    async fn archive(&self, message: &ReceivedMessage) {
        if let Err(e) = self
            .components
            .queue
            .archive(&self.config.queue_name, message.msg_id)
            .await
        {
            warn!(
                msg_id = message.msg_id,
                error = %e,
                "Failed to archive rejected message"
            );
        }
    }
}
