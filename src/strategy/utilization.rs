use anyhow::Result;
use serde_json::json;

use crate::context::MonitorContext;
use crate::pool::ManagedPool;
use crate::strategy::{AlertLevel, MonitorResult, MonitorStrategy, StrategyConfig};

/// Watches the active/max worker ratio of a pool.
///
/// The freshly computed ratio is published into the pass context under
/// `utilization_<pool>` so lower-priority strategies can reuse it.
///
/// Parameters: `warningThreshold` (0.8), `criticalThreshold` (0.95),
/// `checkInterval` (5000 ms).
pub struct UtilizationStrategy {
    warning: f64,
    critical: f64,
    check_interval_ms: u64,
}

impl UtilizationStrategy {
    pub const NAME: &'static str = "UtilizationMonitor";

    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            warning: config.get_f64("warningThreshold", 0.8),
            critical: config.get_f64("criticalThreshold", 0.95),
            check_interval_ms: config.get_u64("checkInterval", 5000),
        }
    }

    pub fn check_interval_ms(&self) -> u64 {
        self.check_interval_ms
    }
}

impl MonitorStrategy for UtilizationStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Watches live worker utilization against warning and critical thresholds"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn evaluate(&self, pool: &dyn ManagedPool, ctx: &MonitorContext) -> Result<MonitorResult> {
        let name = pool.name();

        // A failed counter read still yields a verdict so this rule never
        // goes silent on a broken pool.
        let counters = match pool.counters() {
            Ok(counters) => counters,
            Err(e) => {
                return Ok(MonitorResult::alerting(
                    Self::NAME,
                    name,
                    AlertLevel::Error,
                    format!("pool '{name}' counters unreadable: {e}"),
                )
                .with_action("check the pool adapter; the pool may be torn down"));
            }
        };

        let ratio = if counters.max_size > 0 {
            counters.active as f64 / counters.max_size as f64
        } else {
            0.0
        };
        ctx.set_scratch(MonitorContext::utilization_key(name), json!(ratio));

        let result = if ratio >= self.critical {
            MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Critical,
                format!(
                    "pool '{name}' utilization {:.1}% is at critical level (threshold {:.0}%)",
                    ratio * 100.0,
                    self.critical * 100.0
                ),
            )
            .with_action("increase the maximum pool size or shed load")
        } else if ratio >= self.warning {
            MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Warn,
                format!(
                    "pool '{name}' utilization {:.1}% exceeds warning level (threshold {:.0}%)",
                    ratio * 100.0,
                    self.warning * 100.0
                ),
            )
            .with_action("watch the pool; consider raising capacity")
        } else {
            MonitorResult::ok(
                Self::NAME,
                name,
                format!("pool '{name}' utilization {:.1}% within normal range", ratio * 100.0),
            )
        };

        Ok(result
            .with_data("utilization", json!(ratio))
            .with_data("warningThreshold", json!(self.warning))
            .with_data("criticalThreshold", json!(self.critical))
            .with_data("active", json!(counters.active))
            .with_data("maxSize", json!(counters.max_size)))
    }
}
