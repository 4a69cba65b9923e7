use anyhow::Result;
use serde_json::json;

use crate::context::MonitorContext;
use crate::pool::ManagedPool;
use crate::strategy::{AlertLevel, MonitorResult, MonitorStrategy, StrategyConfig};

/// Watches pool liveness: the health predicate, shutdown state and, when
/// deep checks are enabled, whether counters are still readable.
///
/// Parameters: `deepCheck` (true).
pub struct HealthCheckStrategy {
    deep_check: bool,
}

impl HealthCheckStrategy {
    pub const NAME: &'static str = "HealthCheck";

    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            deep_check: config.get_bool("deepCheck", true),
        }
    }
}

impl MonitorStrategy for HealthCheckStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Watches pool liveness, shutdown state and counter readability"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn evaluate(&self, pool: &dyn ManagedPool, _ctx: &MonitorContext) -> Result<MonitorResult> {
        let name = pool.name();

        if pool.is_shutdown() {
            return Ok(MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Critical,
                format!("pool '{name}' is shut down"),
            )
            .with_action("unregister the pool or restart the owning component"));
        }

        if !pool.is_healthy() {
            return Ok(MonitorResult::alerting(
                Self::NAME,
                name,
                AlertLevel::Error,
                format!("pool '{name}' reports unhealthy"),
            )
            .with_action("inspect the pool's own diagnostics"));
        }

        if self.deep_check {
            if let Err(e) = pool.counters() {
                return Ok(MonitorResult::alerting(
                    Self::NAME,
                    name,
                    AlertLevel::Error,
                    format!("pool '{name}' passed the health predicate but counters are unreadable: {e}"),
                )
                .with_action("check the pool adapter"));
            }
        }

        Ok(MonitorResult::ok(Self::NAME, name, format!("pool '{name}' healthy"))
            .with_data("deepCheck", json!(self.deep_check)))
    }
}
