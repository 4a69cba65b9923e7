//! Pluggable monitoring rules
//!
//! A [`MonitorStrategy`] evaluates one pool against one pass context and
//! produces a [`MonitorResult`]. Strategies are independent of the
//! threshold alerting in [`crate::alerts`]: the alert manager covers the
//! fixed rule set, strategies are the extension point for everything else.
//!
//! ## Execution model
//!
//! - Strategies are sorted by `priority` descending before every pass
//! - `supports` gates which pools a strategy sees
//! - An `Err` from `evaluate` is logged and skipped; it never hides other
//!   strategies' results for the same pass
//!
//! ## Built-ins
//!
//! | Strategy | Priority | Watches |
//! |----------|----------|---------|
//! | `UtilizationMonitor` | 100 | active/max ratio |
//! | `QueueMonitor` | 90 | queue depth and saturation |
//! | `RejectionMonitor` | 80 | cumulative rejected tasks |
//! | `HealthCheck` | 70 | health predicate + shutdown |
//! | `PerformanceAnalysis` | 60 | backlog per worker |

pub mod factory;
pub mod health;
pub mod performance;
pub mod queue;
pub mod rejection;
pub mod utilization;

pub use factory::{StrategyFactory, StrategyKind};
pub use health::HealthCheckStrategy;
pub use performance::PerformanceStrategy;
pub use queue::QueueStrategy;
pub use rejection::RejectionStrategy;
pub use utilization::UtilizationStrategy;

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::MonitorContext;
use crate::pool::ManagedPool;

/// Severity of a strategy verdict, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AlertLevel {
    Info,
    Warn,
    Error,
    Critical,
}

/// Outcome of evaluating one strategy against one pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorResult {
    pub strategy: String,
    pub pool_name: String,
    pub should_alert: bool,
    pub level: AlertLevel,
    pub message: String,
    pub suggested_action: Option<String>,
    pub extended: HashMap<String, Value>,
}

impl MonitorResult {
    /// A calm verdict: `Info`, nothing to alert on.
    pub fn ok(strategy: impl Into<String>, pool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            pool_name: pool.into(),
            should_alert: false,
            level: AlertLevel::Info,
            message: message.into(),
            suggested_action: None,
            extended: HashMap::new(),
        }
    }

    /// An alerting verdict at the given severity.
    pub fn alerting(
        strategy: impl Into<String>,
        pool: impl Into<String>,
        level: AlertLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            pool_name: pool.into(),
            should_alert: true,
            level,
            message: message.into(),
            suggested_action: None,
            extended: HashMap::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extended.insert(key.into(), value);
        self
    }
}

/// Flat key/value parameter set for constructing strategies.
///
/// Recognized keys are documented per strategy; unknown keys are ignored so
/// one parameter bag can configure several strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    params: HashMap<String, Value>,
}

impl StrategyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.params.get(key).and_then(Value::as_u64).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.params.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Parameters for the utilization rule.
    pub fn utilization(warning: f64, critical: f64) -> Self {
        Self::new()
            .set("warningThreshold", warning.into())
            .set("criticalThreshold", critical.into())
    }

    /// Parameters for the queue rule (size thresholds only; utilization
    /// thresholds keep their defaults).
    pub fn queue(warning_size: u64, critical_size: u64) -> Self {
        Self::new()
            .set("warningSize", warning_size.into())
            .set("criticalSize", critical_size.into())
    }

    /// Parameters for the rejection rule.
    pub fn rejection(warning_count: u64, critical_count: u64) -> Self {
        Self::new()
            .set("warningCount", warning_count.into())
            .set("criticalCount", critical_count.into())
    }

    /// Parameters for the health-check rule.
    pub fn health() -> Self {
        Self::new().set("deepCheck", true.into())
    }

    /// Parameters for the performance rule.
    pub fn performance(backlog_warning: u64, analysis_interval_ms: u64) -> Self {
        Self::new()
            .set("backlogWarning", backlog_warning.into())
            .set("analysisInterval", analysis_interval_ms.into())
    }
}

/// One monitoring rule, stateless per invocation.
pub trait MonitorStrategy: Send + Sync {
    /// Unique name; the strategy registry keys on it.
    fn name(&self) -> &str;

    /// Human description for diagnostics.
    fn description(&self) -> &str {
        self.name()
    }

    /// Higher priorities evaluate first within a pass.
    fn priority(&self) -> i32;

    /// Whether this strategy applies to the given pool.
    fn supports(&self, _pool: &dyn ManagedPool) -> bool {
        true
    }

    /// Evaluate the pool. An error skips this strategy for this pool and
    /// pass only.
    fn evaluate(&self, pool: &dyn ManagedPool, ctx: &MonitorContext) -> Result<MonitorResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alert_levels_order_by_severity() {
        assert!(AlertLevel::Info < AlertLevel::Warn);
        assert!(AlertLevel::Warn < AlertLevel::Error);
        assert!(AlertLevel::Error < AlertLevel::Critical);
    }

    #[test]
    fn config_getters_fall_back_to_defaults() {
        let config = StrategyConfig::new().set("warningThreshold", json!(0.5));
        assert_eq!(config.get_f64("warningThreshold", 0.8), 0.5);
        assert_eq!(config.get_f64("criticalThreshold", 0.95), 0.95);
        assert_eq!(config.get_u64("checkInterval", 5000), 5000);
        assert!(config.get_bool("deepCheck", true));
    }

    #[test]
    fn wrong_typed_params_fall_back_to_defaults() {
        let config = StrategyConfig::new().set("warningThreshold", json!("not a number"));
        assert_eq!(config.get_f64("warningThreshold", 0.8), 0.8);
    }

    #[test]
    fn result_builders_carry_action_and_data() {
        let result = MonitorResult::alerting("QueueMonitor", "workers", AlertLevel::Warn, "deep queue")
            .with_action("add workers")
            .with_data("queued", json!(512));

        assert!(result.should_alert);
        assert_eq!(result.level, AlertLevel::Warn);
        assert_eq!(result.suggested_action.as_deref(), Some("add workers"));
        assert_eq!(result.extended.get("queued"), Some(&json!(512)));
    }
}
