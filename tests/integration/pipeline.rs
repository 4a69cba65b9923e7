//! End-to-end pipeline tests
//!
//! A monitoring pass feeds every downstream consumer; these tests verify
//! the whole chain:
//! - Scheduler into rolling series, history and statistics
//! - Threshold breaches into handlers and broadcast subscribers
//! - Type-tuned strategies attached at registration

use chrono::{TimeDelta, Utc};
use poolwatch::alerts::AlertConfig;
use poolwatch::pool::PoolType;
use tokio::time::{Duration, sleep, timeout};

use crate::helpers::*;

#[tokio::test]
async fn test_scheduler_feeds_series_history_and_statistics() {
    let engine = create_fast_engine(15);
    engine
        .register_pool(create_test_pool("workers", PoolType::Fixed))
        .unwrap();

    let started = Utc::now();
    engine.start();
    sleep(Duration::from_millis(80)).await;
    engine.stop();

    let series = engine.get_metrics_series("workers").unwrap();
    assert!(
        series.len() >= 2,
        "series should hold several snapshots, got {}",
        series.len()
    );
    // 3 of 10 workers active in the test pool.
    assert!((series.average() - 30.0).abs() < 1e-9);

    let recent = engine.get_recent_metrics("workers", 10);
    assert!(!recent.is_empty());
    assert_eq!(recent.last().unwrap().pool_name, "workers");

    let report = engine
        .get_statistics("workers", started - TimeDelta::seconds(1), Utc::now())
        .unwrap();
    assert!(report.sample_count >= 2);
    assert!((report.avg_utilization - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_breach_reaches_handler_and_subscriber() {
    let engine = create_fast_engine(500);
    engine.register_pool(create_breaching_pool("hot")).unwrap();
    engine.configure_alert("hot", AlertConfig::default());

    let handler = CountingHandler::new();
    engine.add_alert_handler(handler.clone());
    let mut events = engine.subscribe_alerts();

    let ctx = engine.new_context();
    engine.run_monitor_check(&ctx);

    assert_eq!(
        handler.seen(),
        1,
        "one utilization breach should reach the handler"
    );

    let event = timeout(Duration::from_millis(100), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.pool_name, "hot");
}

#[tokio::test]
async fn test_broadcast_fans_out_to_every_subscriber() {
    let engine = create_fast_engine(500);
    engine.register_pool(create_breaching_pool("hot")).unwrap();
    engine.configure_alert("hot", AlertConfig::default());

    let mut first = engine.subscribe_alerts();
    let mut second = engine.subscribe_alerts();

    let ctx = engine.new_context();
    engine.run_monitor_check(&ctx);

    let a = timeout(Duration::from_millis(100), first.recv())
        .await
        .unwrap()
        .unwrap();
    let b = timeout(Duration::from_millis(100), second.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.pool_name, "hot");
    assert_eq!(b.pool_name, "hot");
}

#[tokio::test]
async fn test_scheduled_passes_debounce_repeat_alerts() {
    let engine = create_fast_engine(15);
    engine.register_pool(create_breaching_pool("hot")).unwrap();
    engine.configure_alert("hot", AlertConfig::default());

    let handler = CountingHandler::new();
    engine.add_alert_handler(handler.clone());

    engine.start();
    sleep(Duration::from_millis(80)).await;
    engine.stop();

    // Several passes ran; the five-minute default debounce allows one event.
    assert!(engine.get_engine_statistics().monitor_cycles >= 2);
    assert_eq!(handler.seen(), 1);
}

#[tokio::test]
async fn test_registration_attaches_type_tuned_strategies() {
    let engine = create_fast_engine(500);
    engine
        .register_pool(create_test_pool("background", PoolType::Cached))
        .unwrap();

    let names = engine.strategy_names();
    assert_eq!(
        names,
        vec!["HealthCheck".to_string(), "PerformanceAnalysis".to_string()]
    );

    let ctx = engine.new_context();
    let results = engine.run_monitor_check(&ctx);
    let strategies: Vec<&str> = results.iter().map(|r| r.strategy.as_str()).collect();
    assert!(strategies.contains(&"PerformanceAnalysis"));
    assert!(strategies.contains(&"HealthCheck"));
}
