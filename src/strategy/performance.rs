use anyhow::{Context, Result};
use serde_json::json;

use crate::context::MonitorContext;
use crate::pool::ManagedPool;
use crate::strategy::{AlertLevel, MonitorResult, MonitorStrategy, StrategyConfig};

/// Watches throughput symptoms: a saturated pool that is also piling up
/// backlog, and pools idling far below their provisioned size.
///
/// Reuses the utilization ratio published into the pass context by the
/// utilization rule when present, so both rules judge the same sample.
///
/// Parameters: `backlogWarning` (50), `analysisInterval` (30000 ms),
/// `saturationThreshold` (0.85).
pub struct PerformanceStrategy {
    backlog_warning: usize,
    analysis_interval_ms: u64,
    saturation: f64,
}

impl PerformanceStrategy {
    pub const NAME: &'static str = "PerformanceAnalysis";

    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            backlog_warning: config.get_u64("backlogWarning", 50) as usize,
            analysis_interval_ms: config.get_u64("analysisInterval", 30_000),
            saturation: config.get_f64("saturationThreshold", 0.85),
        }
    }

    pub fn analysis_interval_ms(&self) -> u64 {
        self.analysis_interval_ms
    }
}

impl MonitorStrategy for PerformanceStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Watches for saturation with growing backlog and for over-provisioned pools"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn evaluate(&self, pool: &dyn ManagedPool, ctx: &MonitorContext) -> Result<MonitorResult> {
        let name = pool.name();
        let counters = pool
            .counters()
            .with_context(|| format!("reading counters of pool '{name}'"))?;

        let ratio = ctx
            .get_scratch(&MonitorContext::utilization_key(name))
            .and_then(|v| v.as_f64())
            .unwrap_or_else(|| {
                if counters.max_size > 0 {
                    counters.active as f64 / counters.max_size as f64
                } else {
                    0.0
                }
            });

        let workers = counters.current_size.max(1);
        let backlog_per_worker = counters.queued as f64 / workers as f64;

        let result = if ratio >= self.saturation && counters.queued >= self.backlog_warning {
            MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Warn,
                format!(
                    "pool '{name}' is saturated ({:.0}% busy) with {} queued tasks ({:.1} per worker)",
                    ratio * 100.0,
                    counters.queued,
                    backlog_per_worker
                ),
            )
            .with_action("throughput is capped; add workers or split the workload")
        } else if ratio < 0.1 && counters.current_size > counters.core_size {
            MonitorResult::ok(
                Self::NAME,
                name,
                format!(
                    "pool '{name}' idles at {:.0}% with {} workers above core size",
                    ratio * 100.0,
                    counters.current_size - counters.core_size
                ),
            )
        } else {
            MonitorResult::ok(Self::NAME, name, format!("pool '{name}' throughput nominal"))
        };

        Ok(result
            .with_data("utilization", json!(ratio))
            .with_data("queued", json!(counters.queued))
            .with_data("backlogPerWorker", json!(backlog_per_worker))
            .with_data("saturationThreshold", json!(self.saturation)))
    }
}
