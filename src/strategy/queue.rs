use anyhow::{Context, Result};
use serde_json::json;

use crate::context::MonitorContext;
use crate::pool::ManagedPool;
use crate::strategy::{AlertLevel, MonitorResult, MonitorStrategy, StrategyConfig};

/// Watches queue depth and, for bounded queues, queue saturation.
///
/// Unbounded queues are judged on absolute depth alone. Bounded queues
/// escalate on whichever is worse at each level: depth crossing the size
/// threshold or fill ratio crossing the utilization threshold.
///
/// Parameters: `warningSize` (100), `criticalSize` (500),
/// `warningUtilizationThreshold` (0.7), `criticalUtilizationThreshold`
/// (0.9), `checkInterval` (3000 ms).
pub struct QueueStrategy {
    warning_size: usize,
    critical_size: usize,
    warning_util: f64,
    critical_util: f64,
    check_interval_ms: u64,
}

impl QueueStrategy {
    pub const NAME: &'static str = "QueueMonitor";

    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            warning_size: config.get_u64("warningSize", 100) as usize,
            critical_size: config.get_u64("criticalSize", 500) as usize,
            warning_util: config.get_f64("warningUtilizationThreshold", 0.7),
            critical_util: config.get_f64("criticalUtilizationThreshold", 0.9),
            check_interval_ms: config.get_u64("checkInterval", 3000),
        }
    }

    pub fn check_interval_ms(&self) -> u64 {
        self.check_interval_ms
    }
}

impl MonitorStrategy for QueueStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Watches queue depth and saturation of bounded queues"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn evaluate(&self, pool: &dyn ManagedPool, _ctx: &MonitorContext) -> Result<MonitorResult> {
        let name = pool.name();
        let counters = pool
            .counters()
            .with_context(|| format!("reading counters of pool '{name}'"))?;
        let queued = counters.queued;

        let result = match counters.queue_remaining {
            None => {
                if queued >= self.critical_size {
                    MonitorResult::alerting(
                        Self::NAME,
                        name,
                        AlertLevel::Critical,
                        format!("pool '{name}' queue depth {queued} at critical level"),
                    )
                    .with_action("drain the queue or add workers; backlog is unbounded")
                } else if queued >= self.warning_size {
                    MonitorResult::alerting(
                        Self::NAME,
                        name,
                        AlertLevel::Warn,
                        format!("pool '{name}' queue depth {queued} above warning level"),
                    )
                    .with_action("watch the backlog; it has no upper bound")
                } else {
                    MonitorResult::ok(Self::NAME, name, format!("pool '{name}' queue depth {queued} nominal"))
                }
            }
            Some(remaining) => {
                let total = queued + remaining;
                let ratio = if total > 0 { queued as f64 / total as f64 } else { 0.0 };

                let result = if queued >= self.critical_size || ratio >= self.critical_util {
                    MonitorResult::alerting(
                        Self::NAME,
                        name,
                        AlertLevel::Critical,
                        format!(
                            "pool '{name}' queue {queued}/{total} ({:.0}% full) at critical level",
                            ratio * 100.0
                        ),
                    )
                    .with_action("submissions will start failing; add capacity now")
                } else if queued >= self.warning_size || ratio >= self.warning_util {
                    MonitorResult::alerting(
                        Self::NAME,
                        name,
                        AlertLevel::Warn,
                        format!(
                            "pool '{name}' queue {queued}/{total} ({:.0}% full) above warning level",
                            ratio * 100.0
                        ),
                    )
                    .with_action("watch the queue; consider a larger bound or more workers")
                } else {
                    MonitorResult::ok(
                        Self::NAME,
                        name,
                        format!("pool '{name}' queue {queued}/{total} nominal"),
                    )
                };
                result.with_data("queueUtilization", json!(ratio))
            }
        };

        Ok(result
            .with_data("queued", json!(queued))
            .with_data("warningSize", json!(self.warning_size))
            .with_data("criticalSize", json!(self.critical_size)))
    }
}
