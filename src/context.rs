//! Per-pass shared context
//!
//! One [`MonitorContext`] exists per monitoring pass. Strategies running in
//! the same pass can hand each other intermediate results through its
//! scratch map; priority ordering decides who writes before who reads.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::engine::EngineStats;

/// Scratch state and configuration handle for one monitoring pass.
pub struct MonitorContext {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    config: Arc<MonitorConfig>,
    stats: Arc<EngineStats>,
    scratch: DashMap<String, Value>,
    attributes: DashMap<String, String>,
}

impl MonitorContext {
    pub fn new(config: Arc<MonitorConfig>, stats: Arc<EngineStats>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            config,
            stats,
            scratch: DashMap::new(),
            attributes: DashMap::new(),
        }
    }

    /// Unique id of this pass, carried into logs and extended result data.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall time spent in this pass so far.
    pub fn elapsed(&self) -> TimeDelta {
        Utc::now() - self.started_at
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Live engine-wide counters; readers may observe a pass mid-update.
    pub fn engine_stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Store a cross-strategy scratch value for the rest of the pass.
    pub fn set_scratch(&self, key: impl Into<String>, value: Value) {
        self.scratch.insert(key.into(), value);
    }

    pub fn get_scratch(&self, key: &str) -> Option<Value> {
        self.scratch.get(key).map(|v| v.clone())
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get_attribute(&self, key: &str) -> Option<String> {
        self.attributes.get(key).map(|v| v.clone())
    }

    /// Scratch key under which the utilization rule publishes a pool's
    /// freshly computed utilization ratio.
    pub fn utilization_key(pool: &str) -> String {
        format!("utilization_{pool}")
    }
}
