//! Concurrency tests
//!
//! These tests verify thread-safety under parallel use:
//! - Async queries racing a running scheduler
//! - Registrations racing each other
//! - Queries interleaved with scheduled passes

use poolwatch::engine::{MonitoringState, RegistrationError};
use poolwatch::pool::PoolType;
use tokio::time::{Duration, sleep};

use crate::helpers::*;

#[tokio::test]
async fn test_parallel_async_queries_see_every_pool() {
    let engine = create_fast_engine(10);
    for i in 0..4 {
        engine
            .register_pool(create_test_pool(&format!("pool-{i}"), PoolType::Fixed))
            .unwrap();
    }
    engine.start();

    // Far more queries than the two default permits.
    let mut tasks = vec![];
    for _ in 0..10 {
        let e = engine.clone();
        tasks.push(tokio::spawn(async move { e.get_all_statuses_async().await }));
    }

    for task in tasks {
        let statuses = task.await.unwrap().unwrap();
        assert_eq!(statuses.len(), 4);
    }

    engine.stop();
}

#[tokio::test]
async fn test_racing_registrations_of_distinct_pools_all_land() {
    let engine = create_fast_engine(500);

    let mut tasks = vec![];
    for i in 0..20 {
        let e = engine.clone();
        tasks.push(tokio::spawn(async move {
            e.register_pool(create_test_pool(&format!("pool-{i}"), PoolType::Single))
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(engine.get_engine_statistics().registered_pools, 20);
}

#[tokio::test]
async fn test_racing_duplicate_registrations_keep_exactly_one() {
    let engine = create_fast_engine(500);

    let mut tasks = vec![];
    for _ in 0..10 {
        let e = engine.clone();
        tasks.push(tokio::spawn(async move {
            e.register_pool(create_test_pool("workers", PoolType::Fixed))
        }));
    }

    let mut accepted = 0;
    let mut refused = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(RegistrationError::AlreadyRegistered(name)) => {
                assert_eq!(name, "workers");
                refused += 1;
            }
            Err(other) => panic!("unexpected registration error: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(refused, 9);
    assert_eq!(engine.get_engine_statistics().registered_pools, 1);
}

#[tokio::test]
async fn test_queries_interleave_with_scheduled_passes() {
    let engine = create_fast_engine(10);
    engine
        .register_pool(create_test_pool("workers", PoolType::Fixed))
        .unwrap();
    engine.start();

    for _ in 0..10 {
        let sync_view = engine.get_all_statuses();
        assert_eq!(sync_view.len(), 1);

        let async_view = engine.get_all_statuses_async().await.unwrap();
        assert_eq!(async_view.len(), 1);

        sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(engine.get_state(), MonitoringState::Running);
    engine.stop();
}
