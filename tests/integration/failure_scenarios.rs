//! Failure isolation tests
//!
//! One broken piece must never take down the rest of a pass:
//! - Pools whose counter reads fail
//! - Alert handlers that return errors
//! - Strategies that fail or panic mid-pass

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use poolwatch::alerts::AlertConfig;
use poolwatch::context::MonitorContext;
use poolwatch::engine::MonitoringState;
use poolwatch::PoolCounters;
use poolwatch::pool::{ManagedPool, PoolType};
use poolwatch::strategy::{MonitorResult, MonitorStrategy};
use tokio::time::{Duration, sleep};

use crate::helpers::*;

/// Counter reads fail while `broken` is set.
struct FlakyPool {
    name: String,
    broken: AtomicBool,
}

impl FlakyPool {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            broken: AtomicBool::new(true),
        })
    }
}

impl ManagedPool for FlakyPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn pool_type(&self) -> PoolType {
        PoolType::Custom
    }

    fn counters(&self) -> Result<PoolCounters> {
        if self.broken.load(Ordering::SeqCst) {
            Err(anyhow!("gauge read timed out"))
        } else {
            Ok(PoolCounters {
                max_size: 10,
                active: 3,
                current_size: 4,
                ..PoolCounters::default()
            })
        }
    }
}

struct ErroringStrategy;

impl MonitorStrategy for ErroringStrategy {
    fn name(&self) -> &str {
        "AlwaysErrs"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn evaluate(&self, _pool: &dyn ManagedPool, _ctx: &MonitorContext) -> Result<MonitorResult> {
        Err(anyhow!("evaluation backend unavailable"))
    }
}

struct PanickingStrategy;

impl MonitorStrategy for PanickingStrategy {
    fn name(&self) -> &str {
        "Panicker"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn evaluate(&self, _pool: &dyn ManagedPool, _ctx: &MonitorContext) -> Result<MonitorResult> {
        panic!("strategy exploded");
    }
}

#[tokio::test]
async fn test_unreadable_pool_is_skipped_until_it_recovers() {
    init_test_logging();
    let engine = create_fast_engine(15);
    let flaky = FlakyPool::new("flaky");
    engine.register_pool(flaky.clone()).unwrap();
    engine
        .register_pool(create_test_pool("steady", PoolType::Fixed))
        .unwrap();

    engine.start();
    sleep(Duration::from_millis(60)).await;

    // The healthy pool collects; the broken one is skipped, not fatal.
    let steady = engine.get_metrics_series("steady").unwrap();
    assert!(steady.len() >= 1);
    let broken = engine.get_metrics_series("flaky").unwrap();
    assert!(broken.is_empty(), "failed reads must not produce snapshots");

    // Recovery is picked up by the next pass.
    flaky.broken.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(60)).await;
    engine.stop();

    let recovered = engine.get_metrics_series("flaky").unwrap();
    assert!(recovered.len() >= 1, "recovered pool should collect again");
}

#[tokio::test]
async fn test_failing_handler_does_not_starve_the_rest() {
    let engine = create_fast_engine(500);
    engine.register_pool(create_breaching_pool("hot")).unwrap();
    engine.configure_alert("hot", AlertConfig::default());

    let failing = CountingHandler::failing();
    let counting = CountingHandler::new();
    engine.add_alert_handler(failing.clone());
    engine.add_alert_handler(counting.clone());
    let mut events = engine.subscribe_alerts();

    let ctx = engine.new_context();
    engine.run_monitor_check(&ctx);

    assert_eq!(failing.seen(), 1);
    assert_eq!(
        counting.seen(),
        1,
        "handlers after a failing one must still run"
    );
    assert!(events.try_recv().is_ok(), "subscribers still get the event");
}

#[tokio::test]
async fn test_erroring_strategy_leaves_other_verdicts_intact() {
    let engine = create_fast_engine(500);
    engine
        .register_pool(create_test_pool("workers", PoolType::WorkStealing))
        .unwrap();
    engine.add_strategy(Arc::new(ErroringStrategy));

    let ctx = engine.new_context();
    let results = engine.run_monitor_check(&ctx);

    // The four stock strategies still report; the failing one is absent.
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.strategy != "AlwaysErrs"));
}

#[tokio::test]
async fn test_pass_panic_parks_the_engine_in_error() {
    init_test_logging();
    let engine = create_fast_engine(20);
    engine
        .register_pool(create_test_pool("workers", PoolType::Fixed))
        .unwrap();
    engine.add_strategy(Arc::new(PanickingStrategy));

    engine.start();
    sleep(Duration::from_millis(70)).await;
    assert_eq!(engine.get_state(), MonitoringState::Error);

    // Removing the broken strategy and starting again recovers.
    assert!(engine.remove_strategy("Panicker"));
    engine.start();
    sleep(Duration::from_millis(70)).await;

    assert_eq!(engine.get_state(), MonitoringState::Running);
    assert!(engine.get_engine_statistics().monitor_cycles >= 1);
    engine.stop();
}

#[tokio::test]
async fn test_unhealthy_pool_is_reported_but_still_collected() {
    let engine = create_fast_engine(500);
    let pool = create_test_pool("ailing", PoolType::Fixed);
    pool.set_healthy(false);
    engine.register_pool(pool).unwrap();

    let ctx = engine.new_context();
    engine.run_monitor_check(&ctx);

    assert_eq!(engine.unhealthy_pools(), vec!["ailing".to_string()]);
    assert!(engine.healthy_pools().is_empty());

    // Sick pools keep reporting metrics; operators need them the most.
    let series = engine.get_metrics_series("ailing").unwrap();
    assert_eq!(series.len(), 1);
}
