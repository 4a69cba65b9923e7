//! Embeddable monitoring and alerting engine for externally-owned worker
//! pools. Hosts register pools, the engine samples their counters on a
//! fixed interval, keeps bounded metric windows, and raises debounced
//! alerts through pluggable strategies.

pub mod alerts;
pub mod config;
pub mod context;
pub mod engine;
pub mod metrics;
pub mod pool;
pub mod strategy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw counter reading taken from one worker pool.
///
/// `queue_remaining` is `None` for unbounded queues. `rejected` is `None`
/// when the pool does not track rejected work at all, which is different
/// from a tracked count of zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolCounters {
    pub core_size: usize,
    pub max_size: usize,
    pub active: usize,
    pub current_size: usize,
    pub submitted: u64,
    pub completed: u64,
    pub queued: usize,
    pub queue_remaining: Option<usize>,
    pub rejected: Option<u64>,
}

/// One timestamped reading of a pool's counters plus derived ratios.
///
/// Snapshots are immutable once built and are only produced by the
/// collection step, so every downstream consumer (series, history, alert
/// checks, strategies) sees the same numbers for a given instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub pool_name: String,
    pub captured_at: DateTime<Utc>,
    pub core_size: usize,
    pub max_size: usize,
    pub active: usize,
    pub current_size: usize,
    pub submitted: u64,
    pub completed: u64,
    pub queued: usize,
    /// Remaining queue capacity; `None` when the queue is unbounded.
    pub queue_remaining: Option<usize>,
    /// Rejected task count. Zero when the pool does not track rejections;
    /// check `rejected_tracked` to tell the two cases apart.
    pub rejected: u64,
    pub rejected_tracked: bool,
    /// active / max size, 0-100 scale. Zero when max size is zero.
    pub utilization: f64,
    /// queued / (queued + remaining), 0-100 scale. Zero for unbounded queues.
    pub queue_utilization: f64,
}

impl StatusSnapshot {
    /// Build a snapshot from a raw counter reading.
    pub fn from_counters(
        pool_name: impl Into<String>,
        counters: &PoolCounters,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let utilization = if counters.max_size > 0 {
            counters.active as f64 / counters.max_size as f64 * 100.0
        } else {
            0.0
        };

        let queue_utilization = match counters.queue_remaining {
            Some(remaining) => {
                let total = counters.queued + remaining;
                if total > 0 {
                    counters.queued as f64 / total as f64 * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        Self {
            pool_name: pool_name.into(),
            captured_at,
            core_size: counters.core_size,
            max_size: counters.max_size,
            active: counters.active,
            current_size: counters.current_size,
            submitted: counters.submitted,
            completed: counters.completed,
            queued: counters.queued,
            queue_remaining: counters.queue_remaining,
            rejected: counters.rejected.unwrap_or(0),
            rejected_tracked: counters.rejected.is_some(),
            utilization,
            queue_utilization,
        }
    }

    /// Whether the pool's queue has a capacity bound.
    pub fn queue_bounded(&self) -> bool {
        self.queue_remaining.is_some()
    }
}
