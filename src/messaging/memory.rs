//! In-process `TaskQueue` with pgmq's delivery semantics: FIFO reads,
//! visibility timeouts, redelivery of unacknowledged messages and an archive.

use super::errors::{MessagingError, MessagingResult};
use super::message::{ChangeMessage, ReceivedMessage};
use super::queue::TaskQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredMessage {
    msg_id: i64,
    read_count: i32,
    enqueued_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl StoredMessage {
    fn to_received(&self) -> ReceivedMessage {
        ReceivedMessage {
            msg_id: self.msg_id,
            read_count: self.read_count,
            enqueued_at: self.enqueued_at,
            payload: self.payload.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<StoredMessage>,
    in_flight: HashMap<i64, (StoredMessage, Instant)>,
    archived: Vec<StoredMessage>,
}

impl QueueState {
    /// Return messages whose visibility timeout elapsed to the ready queue,
    /// keeping msg_id order
    fn release_expired(&mut self, now: Instant) {
        let expired: Vec<i64> = self
            .in_flight
            .iter()
            .filter(|(_, (_, visible_at))| *visible_at <= now)
            .map(|(msg_id, _)| *msg_id)
            .collect();

        for msg_id in expired {
            if let Some((message, _)) = self.in_flight.remove(&msg_id) {
                self.ready.push_back(message);
            }
        }
        self.ready.make_contiguous().sort_by_key(|m| m.msg_id);
    }

    fn take(&mut self, msg_id: i64) -> Option<StoredMessage> {
        if let Some((message, _)) = self.in_flight.remove(&msg_id) {
            return Some(message);
        }
        let position = self.ready.iter().position(|m| m.msg_id == msg_id)?;
        self.ready.remove(position)
    }
}

#[derive(Debug)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, QueueState>>,
    next_msg_id: AtomicI64,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            next_msg_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting to be received
    pub fn pending_count(&self, queue_name: &str) -> usize {
        self.queues
            .lock()
            .get(queue_name)
            .map(|state| state.ready.len())
            .unwrap_or(0)
    }

    /// Messages received but neither acknowledged nor archived
    pub fn in_flight_count(&self, queue_name: &str) -> usize {
        self.queues
            .lock()
            .get(queue_name)
            .map(|state| state.in_flight.len())
            .unwrap_or(0)
    }

    pub fn archived(&self, queue_name: &str) -> Vec<ReceivedMessage> {
        self.queues
            .lock()
            .get(queue_name)
            .map(|state| state.archived.iter().map(StoredMessage::to_received).collect())
            .unwrap_or_default()
    }

    /// Enqueue an arbitrary payload, bypassing `ChangeMessage` encoding
    pub fn publish_raw(&self, queue_name: &str, payload: serde_json::Value) -> MessagingResult<i64> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let msg_id = self.next_msg_id.fetch_add(1, Ordering::SeqCst);
        state.ready.push_back(StoredMessage {
            msg_id,
            read_count: 0,
            enqueued_at: Utc::now(),
            payload,
        });
        Ok(msg_id)
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.queues
            .lock()
            .entry(queue_name.to_string())
            .or_default();
        Ok(())
    }

    async fn publish(&self, queue_name: &str, message: &ChangeMessage) -> MessagingResult<i64> {
        let msg_id = self.publish_raw(queue_name, message.to_payload()?)?;
        debug!(queue = queue_name, msg_id = msg_id, change_id = %message.change_id, "Message sent");
        Ok(msg_id)
    }

    async fn receive(
        &self,
        queue_name: &str,
        visibility_timeout_seconds: i32,
        limit: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Instant::now();
        state.release_expired(now);

        let visible_at = now + Duration::from_secs(visibility_timeout_seconds.max(0) as u64);
        let mut received = Vec::new();
        while received.len() < limit.max(0) as usize {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.read_count += 1;
            received.push(message.to_received());
            state.in_flight.insert(message.msg_id, (message, visible_at));
        }

        Ok(received)
    }

    async fn ack(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        if state.take(msg_id).is_none() {
            debug!(queue = queue_name, msg_id = msg_id, "Ack for unknown message ignored");
        }
        Ok(())
    }

    async fn archive(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        if let Some(message) = state.take(msg_id) {
            state.archived.push(message);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
