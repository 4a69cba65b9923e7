//! Helper functions for integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use poolwatch::alerts::{AlertEvent, AlertHandler};
use poolwatch::config::MonitorConfig;
use poolwatch::engine::MonitorEngine;
use poolwatch::pool::{GaugePool, PoolGauges, PoolType};

/// Route engine logs through the test harness. Safe to call repeatedly;
/// only the first call installs a subscriber.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn create_test_pool(name: &str, pool_type: PoolType) -> Arc<GaugePool> {
    let gauges = Arc::new(PoolGauges::new());
    gauges.core_size.store(2, Ordering::Relaxed);
    gauges.max_size.store(10, Ordering::Relaxed);
    gauges.current_size.store(4, Ordering::Relaxed);
    gauges.active.store(3, Ordering::Relaxed);
    Arc::new(GaugePool::new(name, pool_type, gauges))
}

/// 9 of 10 workers busy: trips the default 80% utilization threshold and
/// nothing else.
pub fn create_breaching_pool(name: &str) -> Arc<GaugePool> {
    let gauges = Arc::new(PoolGauges::new());
    gauges.core_size.store(2, Ordering::Relaxed);
    gauges.max_size.store(10, Ordering::Relaxed);
    gauges.current_size.store(10, Ordering::Relaxed);
    gauges.active.store(9, Ordering::Relaxed);
    Arc::new(GaugePool::new(name, PoolType::Fixed, gauges))
}

pub fn create_fast_engine(interval_ms: u64) -> MonitorEngine {
    MonitorEngine::new(MonitorConfig {
        monitor_interval: Duration::from_millis(interval_ms),
        ..MonitorConfig::default()
    })
    .unwrap()
}

/// Counts every alert event it receives; the failing variant also returns
/// an error after counting.
pub struct CountingHandler {
    seen: AtomicUsize,
    fail: bool,
}

impl CountingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            seen: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl AlertHandler for CountingHandler {
    fn handle(&self, _event: &AlertEvent) -> anyhow::Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("handler rejected the event");
        }
        Ok(())
    }
}
