use anyhow::{Context, Result};
use serde_json::json;

use crate::context::MonitorContext;
use crate::pool::ManagedPool;
use crate::strategy::{AlertLevel, MonitorResult, MonitorStrategy, StrategyConfig};

/// Watches the cumulative rejected-task counter.
///
/// Pools that do not track rejections always get a calm verdict; absence
/// of the counter is not treated as zero rejections.
///
/// Parameters: `warningCount` (10), `criticalCount` (50).
pub struct RejectionStrategy {
    warning_count: u64,
    critical_count: u64,
}

impl RejectionStrategy {
    pub const NAME: &'static str = "RejectionMonitor";

    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            warning_count: config.get_u64("warningCount", 10),
            critical_count: config.get_u64("criticalCount", 50),
        }
    }
}

impl MonitorStrategy for RejectionStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Watches the cumulative count of rejected task submissions"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn evaluate(&self, pool: &dyn ManagedPool, _ctx: &MonitorContext) -> Result<MonitorResult> {
        let name = pool.name();
        let counters = pool
            .counters()
            .with_context(|| format!("reading counters of pool '{name}'"))?;

        let result = match counters.rejected {
            None => MonitorResult::ok(
                Self::NAME,
                name,
                format!("pool '{name}' does not track rejections"),
            ),
            Some(rejected) if rejected >= self.critical_count => MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Critical,
                format!("pool '{name}' rejected {rejected} tasks (critical at {})", self.critical_count),
            )
            .with_action("the pool is refusing work; grow the queue or pool, or shed load")
            .with_data("rejected", json!(rejected)),
            Some(rejected) if rejected >= self.warning_count => MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Warn,
                format!("pool '{name}' rejected {rejected} tasks (warning at {})", self.warning_count),
            )
            .with_action("investigate submission bursts before rejections climb")
            .with_data("rejected", json!(rejected)),
            Some(rejected) => MonitorResult::ok(
                Self::NAME,
                name,
                format!("pool '{name}' rejections ({rejected}) within tolerance"),
            )
            .with_data("rejected", json!(rejected)),
        };

        Ok(result
            .with_data("warningCount", json!(self.warning_count))
            .with_data("criticalCount", json!(self.critical_count)))
    }
}
