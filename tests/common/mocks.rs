//! Store and queue doubles that fail a configured number of times before
//! delegating to the in-memory implementations.

use async_trait::async_trait;
use opsdesk::messaging::{
    ChangeMessage, InMemoryQueue, MessagingError, MessagingResult, ReceivedMessage, TaskQueue,
};
use opsdesk::models::{Change, NewChange, StatsRecord};
use opsdesk::store::{
    ChangeStore, InMemoryChangeStore, InMemoryStatsStore, StatsStore, StatsUpdate, StoreError,
    StoreResult,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Decrement the budget and report whether this call should fail
fn take_failure(remaining: &AtomicU32) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Stats store whose `record_lead_time` fails the first N calls
#[derive(Default)]
pub struct FlakyStatsStore {
    pub inner: InMemoryStatsStore,
    failures_remaining: AtomicU32,
}

impl FlakyStatsStore {
    pub fn failing(times: u32) -> Self {
        Self {
            inner: InMemoryStatsStore::new(),
            failures_remaining: AtomicU32::new(times),
        }
    }
}

#[async_trait]
impl StatsStore for FlakyStatsStore {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<StatsRecord>> {
        self.inner.get_by_key(key).await
    }

    async fn record_lead_time(
        &self,
        key: &str,
        lead_time_minutes: f64,
        now: f64,
    ) -> StoreResult<StatsUpdate> {
        if take_failure(&self.failures_remaining) {
            return Err(StoreError::unavailable("stats store offline"));
        }
        self.inner.record_lead_time(key, lead_time_minutes, now).await
    }
}

/// Change store whose reads fail while `offline` is set
#[derive(Default)]
pub struct FlakyChangeStore {
    pub inner: InMemoryChangeStore,
    pub offline: AtomicBool,
}

#[async_trait]
impl ChangeStore for FlakyChangeStore {
    async fn insert(&self, new_change: NewChange) -> StoreResult<Change> {
        self.inner.insert(new_change).await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Change>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("change store offline"));
        }
        self.inner.get_by_id(id).await
    }

    async fn list(&self) -> StoreResult<Vec<Change>> {
        self.inner.list().await
    }

    async fn health_check(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

/// Queue whose publishes fail the first N calls and whose acks can be
/// switched off
#[derive(Default)]
pub struct FlakyQueue {
    pub inner: InMemoryQueue,
    publish_failures_remaining: AtomicU32,
    pub fail_acks: AtomicBool,
    pub publish_calls: AtomicU32,
}

impl FlakyQueue {
    pub fn failing_publishes(times: u32) -> Self {
        Self {
            publish_failures_remaining: AtomicU32::new(times),
            ..Self::default()
        }
    }
}

#[async_trait]
impl TaskQueue for FlakyQueue {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.inner.ensure_queue(queue_name).await
    }

    async fn publish(&self, queue_name: &str, message: &ChangeMessage) -> MessagingResult<i64> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.publish_failures_remaining) {
            return Err(MessagingError::queue_operation(
                queue_name,
                "send",
                "broker unreachable",
            ));
        }
        self.inner.publish(queue_name, message).await
    }

    async fn receive(
        &self,
        queue_name: &str,
        visibility_timeout_seconds: i32,
        limit: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>> {
        self.inner
            .receive(queue_name, visibility_timeout_seconds, limit)
            .await
    }

    async fn ack(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(MessagingError::queue_operation(
                queue_name,
                "delete",
                "broker unreachable",
            ));
        }
        self.inner.ack(queue_name, msg_id).await
    }

    async fn archive(&self, queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        self.inner.archive(queue_name, msg_id).await
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Sets its flag when dropped, i.e. when the future holding it is cancelled
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Queue whose `receive` never returns, pinning a worker mid-batch
#[derive(Default)]
pub struct StallingQueue {
    pub receive_cancelled: Arc<AtomicBool>,
}

#[async_trait]
impl TaskQueue for StallingQueue {
    async fn ensure_queue(&self, _queue_name: &str) -> MessagingResult<()> {
        Ok(())
    }

    async fn publish(&self, queue_name: &str, _message: &ChangeMessage) -> MessagingResult<i64> {
        Err(MessagingError::queue_operation(queue_name, "send", "read-only queue"))
    }

    async fn receive(
        &self,
        _queue_name: &str,
        _visibility_timeout_seconds: i32,
        _limit: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>> {
        let _flag = DropFlag(self.receive_cancelled.clone());
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }

    async fn ack(&self, _queue_name: &str, _msg_id: i64) -> MessagingResult<()> {
        Ok(())
    }

    async fn archive(&self, _queue_name: &str, _msg_id: i64) -> MessagingResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
