use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pool::PoolType;
use crate::strategy::{
    HealthCheckStrategy, MonitorStrategy, PerformanceStrategy, QueueStrategy, RejectionStrategy,
    StrategyConfig, UtilizationStrategy,
};

/// Builds a strategy instance from a parameter set.
pub type StrategyCreator = Arc<dyn Fn(&StrategyConfig) -> Arc<dyn MonitorStrategy> + Send + Sync>;

/// The built-in strategy families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Utilization,
    Queue,
    Rejection,
    HealthCheck,
    Performance,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Utilization,
        StrategyKind::Queue,
        StrategyKind::Rejection,
        StrategyKind::HealthCheck,
        StrategyKind::Performance,
    ];

    /// Canonical lookup key, also registered in the name table.
    pub fn key(self) -> &'static str {
        match self {
            StrategyKind::Utilization => "utilization",
            StrategyKind::Queue => "queue",
            StrategyKind::Rejection => "rejection",
            StrategyKind::HealthCheck => "health",
            StrategyKind::Performance => "performance",
        }
    }
}

/// Registry of strategy creators, keyed by [`StrategyKind`] and by
/// case-insensitive name.
///
/// Registering a creator for an existing key replaces it, so embedders can
/// swap a built-in family for their own implementation while keeping the
/// per-pool-type defaults below.
pub struct StrategyFactory {
    by_kind: DashMap<StrategyKind, StrategyCreator>,
    by_name: DashMap<String, StrategyCreator>,
}

impl StrategyFactory {
    pub fn new() -> Self {
        let factory = Self {
            by_kind: DashMap::new(),
            by_name: DashMap::new(),
        };
        factory.register_builtins();
        factory
    }

    fn register_builtins(&self) {
        self.register_kind(
            StrategyKind::Utilization,
            Arc::new(|config| Arc::new(UtilizationStrategy::new(config))),
        );
        self.register_kind(
            StrategyKind::Queue,
            Arc::new(|config| Arc::new(QueueStrategy::new(config))),
        );
        self.register_kind(
            StrategyKind::Rejection,
            Arc::new(|config| Arc::new(RejectionStrategy::new(config))),
        );
        self.register_kind(
            StrategyKind::HealthCheck,
            Arc::new(|config| Arc::new(HealthCheckStrategy::new(config))),
        );
        self.register_kind(
            StrategyKind::Performance,
            Arc::new(|config| Arc::new(PerformanceStrategy::new(config))),
        );
    }

    /// Register (or replace) the creator for a strategy family. The
    /// creator is also reachable through the family's canonical name.
    pub fn register_kind(&self, kind: StrategyKind, creator: StrategyCreator) {
        self.by_name.insert(kind.key().to_string(), Arc::clone(&creator));
        self.by_kind.insert(kind, creator);
    }

    /// Register (or replace) a creator under a custom name.
    pub fn register_named(&self, name: impl Into<String>, creator: StrategyCreator) {
        let name = name.into().to_lowercase();
        debug!(%name, "registering named strategy creator");
        self.by_name.insert(name, creator);
    }

    pub fn create(&self, kind: StrategyKind, config: &StrategyConfig) -> Option<Arc<dyn MonitorStrategy>> {
        self.by_kind.get(&kind).map(|creator| creator(config))
    }

    /// Case-insensitive lookup by name.
    pub fn create_named(&self, name: &str, config: &StrategyConfig) -> Option<Arc<dyn MonitorStrategy>> {
        self.by_name.get(&name.to_lowercase()).map(|creator| creator(config))
    }

    /// The general-purpose rule set: utilization, queue, rejection and
    /// health with their stock thresholds.
    pub fn create_default_strategies(&self) -> Vec<Arc<dyn MonitorStrategy>> {
        [
            (StrategyKind::Utilization, StrategyConfig::utilization(0.8, 0.95)),
            (StrategyKind::Queue, StrategyConfig::queue(100, 500)),
            (StrategyKind::Rejection, StrategyConfig::rejection(10, 50)),
            (StrategyKind::HealthCheck, StrategyConfig::health()),
        ]
        .into_iter()
        .filter_map(|(kind, config)| self.create(kind, &config))
        .collect()
    }

    /// A rule set tuned to how each pool type typically misbehaves.
    ///
    /// Fixed pools run hot on purpose, so utilization thresholds are
    /// raised and the bounded queue watched closely. Cached pools grow
    /// instead of queueing, so throughput and liveness matter more.
    /// Unknown types fall back to the general-purpose set.
    pub fn strategies_for_pool_type(&self, pool_type: PoolType) -> Vec<Arc<dyn MonitorStrategy>> {
        let tuned: &[(StrategyKind, StrategyConfig)] = match pool_type {
            PoolType::Fixed => &[
                (StrategyKind::Utilization, StrategyConfig::utilization(0.9, 0.98)),
                (StrategyKind::Queue, StrategyConfig::queue(200, 1000)),
            ],
            PoolType::Cached => &[
                (StrategyKind::Performance, StrategyConfig::performance(50, 30_000)),
                (StrategyKind::HealthCheck, StrategyConfig::health()),
            ],
            PoolType::Scheduled => &[
                (StrategyKind::Utilization, StrategyConfig::utilization(0.7, 0.9)),
                (StrategyKind::Performance, StrategyConfig::performance(100, 60_000)),
            ],
            PoolType::Single => &[
                (StrategyKind::Queue, StrategyConfig::queue(50, 200)),
                (StrategyKind::HealthCheck, StrategyConfig::health()),
            ],
            PoolType::WorkStealing | PoolType::Custom => {
                return self.create_default_strategies();
            }
        };

        tuned
            .iter()
            .filter_map(|(kind, config)| self.create(*kind, config))
            .collect()
    }
}

impl Default for StrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}
