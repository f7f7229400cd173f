//! Postgres-backed store and queue tests. Run with
//! `DATABASE_URL=... cargo test --features integration-tests`. pgmq creates
//! its queue tables on first use.

#![cfg(feature = "integration-tests")]

use opsdesk::aggregation::rolling::ewma;
use opsdesk::constants::aggregation::{GLOBAL_STATS_KEY, LEAD_TIME_SMOOTHING_FACTOR};
use opsdesk::messaging::{ChangeMessage, PgmqClient, TaskQueue};
use opsdesk::models::NewChange;
use opsdesk::store::{ChangeStore, PgChangeStore, PgStatsStore, StatsStore, StoreError};
use sqlx::PgPool;
use std::sync::Arc;

fn new_change(id: &str, created_at: f64) -> NewChange {
    NewChange {
        id: id.to_string(),
        title: format!("deploy {id}"),
        status: "OPEN".to_string(),
        created_at,
    }
}

#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]
async fn test_change_insert_conflict_and_listing(pool: PgPool) -> sqlx::Result<()> {
    let store = PgChangeStore::new(pool);

    store.insert(new_change("b", 200.0)).await.unwrap();
    store.insert(new_change("a", 100.0)).await.unwrap();

    let err = store.insert(new_change("a", 300.0)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let fetched = store.get_by_id("a").await.unwrap().unwrap();
    assert_eq!(fetched.created_at, 100.0);
    assert!(store.get_by_id("missing").await.unwrap().is_none());
    assert!(store.health_check().await);
    Ok(())
}

#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]
async fn test_record_lead_time_creates_then_folds(pool: PgPool) -> sqlx::Result<()> {
    let store = PgStatsStore::new(pool);

    let first = store.record_lead_time(GLOBAL_STATS_KEY, 10.0, 1_000.0).await.unwrap();
    assert!(first.created);
    assert_eq!(first.record.lead_time_avg_minutes, 10.0);

    let second = store.record_lead_time(GLOBAL_STATS_KEY, 30.0, 2_000.0).await.unwrap();
    assert!(!second.created);
    assert!((second.record.lead_time_avg_minutes - 14.0).abs() < 1e-9);

    let stored = store.get_by_key(GLOBAL_STATS_KEY).await.unwrap().unwrap();
    assert_eq!(stored.updated_at, 2_000.0);
    assert_eq!(stored.change_failure_rate, 0.0);
    Ok(())
}

#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]
async fn test_concurrent_updates_are_serialized(pool: PgPool) -> sqlx::Result<()> {
    let store = Arc::new(PgStatsStore::new(pool));
    let observations = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];

    let handles: Vec<_> = observations
        .iter()
        .map(|&minutes| {
            let store = store.clone();
            tokio::spawn(async move {
                let update = store
                    .record_lead_time(GLOBAL_STATS_KEY, minutes, 1_000.0)
                    .await
                    .unwrap();
                (minutes, update.record.lead_time_avg_minutes, update.created)
            })
        })
        .collect();

    let mut commits = Vec::new();
    for handle in handles {
        commits.push(handle.await.unwrap());
    }
    assert_eq!(commits.iter().filter(|(_, _, created)| *created).count(), 1);

    // Rebuild the commit chain: each update must have read the result of
    // exactly one earlier commit, so every observation is folded in once
    let (first_index, _) = commits
        .iter()
        .enumerate()
        .find(|(_, (_, _, created))| *created)
        .unwrap();
    let (_, mut current, _) = commits.remove(first_index);
    while !commits.is_empty() {
        let next = commits
            .iter()
            .position(|(minutes, avg, _)| {
                (ewma(current, *minutes, LEAD_TIME_SMOOTHING_FACTOR) - avg).abs() < 1e-9
            })
            .expect("an update was computed from a stale read");
        current = commits.remove(next).1;
    }

    let stored = store.get_by_key(GLOBAL_STATS_KEY).await.unwrap().unwrap();
    assert!((stored.lead_time_avg_minutes - current).abs() < 1e-9);
    Ok(())
}

#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]
async fn test_pgmq_round_trip(pool: PgPool) -> sqlx::Result<()> {
    let queue = PgmqClient::new_with_pool(pool).await;
    queue.ensure_queue("process_change_test").await.unwrap();

    let msg_id = queue
        .publish("process_change_test", &ChangeMessage::new("c1"))
        .await
        .unwrap();

    let received = queue.receive("process_change_test", 30, 10).await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].msg_id, msg_id);
    assert_eq!(received[0].change_message().unwrap().change_id, "c1");

    queue.ack("process_change_test", msg_id).await.unwrap();
    assert!(queue.receive("process_change_test", 0, 10).await.unwrap().is_empty());
    assert!(queue.health_check().await);
    Ok(())
}

#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]
async fn test_health_check_fails_on_closed_pool(pool: PgPool) -> sqlx::Result<()> {
    assert!(opsdesk::database::health_check(&pool).await.is_ok());

    let store = PgChangeStore::new(pool.clone());
    pool.close().await;

    assert!(opsdesk::database::health_check(&pool).await.is_err());
    assert!(!store.health_check().await);
    Ok(())
}

#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]
async fn test_late_writer_does_not_rewind_updated_at(pool: PgPool) -> sqlx::Result<()> {
    let store = PgStatsStore::new(pool);

    store
        .record_lead_time(GLOBAL_STATS_KEY, 10.0, 1_200.0)
        .await
        .unwrap();
    store
        .record_lead_time(GLOBAL_STATS_KEY, 20.0, 1_100.0)
        .await
        .unwrap();

    let stored = store.get_by_key(GLOBAL_STATS_KEY).await.unwrap().unwrap();
    assert_eq!(stored.updated_at, 1_200.0);
    Ok(())
}
