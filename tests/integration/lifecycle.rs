//! Lifecycle tests for the monitoring engine
//!
//! These tests drive the engine through its full state machine:
//! - Start, pause, resume, stop transitions
//! - Restart after stop
//! - Graceful shutdown timing

use std::time::Instant;

use poolwatch::engine::MonitoringState;
use poolwatch::pool::PoolType;
use tokio::time::{Duration, sleep};

use crate::helpers::*;

#[tokio::test]
async fn test_state_transitions_through_the_full_lifecycle() {
    let engine = create_fast_engine(20);
    assert_eq!(engine.get_state(), MonitoringState::NotStarted);

    engine.start();
    assert_eq!(engine.get_state(), MonitoringState::Running);

    engine.pause();
    assert_eq!(engine.get_state(), MonitoringState::Paused);

    engine.resume();
    assert_eq!(engine.get_state(), MonitoringState::Running);

    engine.stop();
    assert_eq!(engine.get_state(), MonitoringState::Stopped);
}

#[tokio::test]
async fn test_pause_and_resume_before_start_are_ignored() {
    let engine = create_fast_engine(20);

    engine.pause();
    assert_eq!(engine.get_state(), MonitoringState::NotStarted);

    engine.resume();
    assert_eq!(engine.get_state(), MonitoringState::NotStarted);
}

#[tokio::test]
async fn test_restart_after_stop_resumes_collection() {
    let engine = create_fast_engine(20);
    engine
        .register_pool(create_test_pool("workers", PoolType::Fixed))
        .unwrap();

    engine.start();
    sleep(Duration::from_millis(70)).await;
    engine.stop();

    // Let an in-flight tick drain before taking the baseline.
    sleep(Duration::from_millis(30)).await;
    let after_first_run = engine.get_engine_statistics().monitor_cycles;
    assert!(
        after_first_run >= 1,
        "first run should have completed passes, got {after_first_run}"
    );

    // A stopped engine collects nothing.
    sleep(Duration::from_millis(70)).await;
    assert_eq!(
        engine.get_engine_statistics().monitor_cycles,
        after_first_run
    );

    engine.start();
    assert_eq!(engine.get_state(), MonitoringState::Running);
    sleep(Duration::from_millis(70)).await;
    let after_restart = engine.get_engine_statistics().monitor_cycles;
    assert!(
        after_restart > after_first_run,
        "restart should collect again, got {after_restart}"
    );

    engine.stop();
}

#[tokio::test]
async fn test_shutdown_completes_within_the_grace_window() {
    let engine = create_fast_engine(10);
    engine
        .register_pool(create_test_pool("workers", PoolType::Fixed))
        .unwrap();
    engine.start();
    sleep(Duration::from_millis(40)).await;

    let started = Instant::now();
    engine.shutdown().await.unwrap();
    let took = started.elapsed();

    assert_eq!(engine.get_state(), MonitoringState::Stopped);
    assert!(
        took < Duration::from_secs(1),
        "shutdown took too long: {took:?}"
    );
}

#[tokio::test]
async fn test_shutdown_without_start_is_clean() {
    let engine = create_fast_engine(20);
    engine.shutdown().await.unwrap();
    assert_eq!(engine.get_state(), MonitoringState::Stopped);
}

#[tokio::test]
async fn test_engine_statistics_track_pools_and_state() {
    let engine = create_fast_engine(20);
    engine
        .register_pool(create_test_pool("io", PoolType::Fixed))
        .unwrap();
    engine
        .register_pool(create_test_pool("compute", PoolType::Cached))
        .unwrap();

    let stats = engine.get_engine_statistics();
    assert_eq!(stats.registered_pools, 2);
    assert_eq!(stats.state, MonitoringState::NotStarted);
    assert_eq!(stats.monitor_cycles, 0);
    assert!(stats.last_pass_at.is_none());

    engine.start();
    sleep(Duration::from_millis(60)).await;
    engine.stop();

    let stats = engine.get_engine_statistics();
    assert!(stats.monitor_cycles >= 1);
    assert!(stats.last_pass_at.is_some());
    assert!(stats.avg_pass_latency_ms >= 0.0);
}
