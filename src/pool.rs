//! Pool capability surface.
//!
//! The engine never owns the pools it watches. Everything it needs from one
//! is behind [`ManagedPool`]: a name, a type tag, a counter read, and a
//! health verdict. [`PoolGauges`]/[`GaugePool`] are the reference
//! implementation for hosts whose pools publish counters themselves.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::PoolCounters;

/// Broad classification of a worker pool.
///
/// Used at registration time to pick a type-tuned subset of monitoring
/// strategies; a fixed-size pool warrants tighter utilization thresholds
/// than an elastic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolType {
    Fixed,
    Cached,
    Single,
    Scheduled,
    WorkStealing,
    Custom,
}

/// Capability the engine consumes for every monitored pool.
///
/// Implementations must be cheap to call: `counters` runs inside every
/// monitoring pass and must only read in-memory state, never block on I/O.
/// A failing `counters` read skips the pool for that pass only; it is
/// retried on the next one.
pub trait ManagedPool: Send + Sync {
    /// Unique pool name; registration rejects duplicates.
    fn name(&self) -> &str;

    /// Type tag used for strategy auto-attachment.
    fn pool_type(&self) -> PoolType;

    /// Read the pool's live counters.
    fn counters(&self) -> Result<PoolCounters>;

    /// The pool's own health verdict. The engine additionally requires the
    /// pool not to be shut down before listing it as healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Whether the pool has stopped accepting work.
    fn is_shutdown(&self) -> bool {
        false
    }

    /// Free-form business tags (owning team, traffic class, ...).
    fn tags(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Relative importance of this pool to the host application.
    fn priority(&self) -> i32 {
        100
    }
}

/// Shareable counter bundle an embedding worker pool updates from its own
/// execution path.
///
/// Rejection tracking is opt-in: call [`PoolGauges::track_rejections`] when
/// installing a counting rejection hook, then [`PoolGauges::record_rejection`]
/// from the rejection path. Pools that never opt in report the rejected
/// counter as untracked rather than as a confirmed zero.
#[derive(Debug, Default)]
pub struct PoolGauges {
    pub core_size: AtomicUsize,
    pub max_size: AtomicUsize,
    pub active: AtomicUsize,
    pub current_size: AtomicUsize,
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub queued: AtomicUsize,
    /// Queue capacity; zero means unbounded.
    pub queue_capacity: AtomicUsize,
    rejected: AtomicU64,
    rejected_tracked: AtomicBool,
}

impl PoolGauges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the rejected counter as maintained by the host.
    pub fn track_rejections(&self) {
        self.rejected_tracked.store(true, Ordering::Relaxed);
    }

    /// Count one rejected task. Implies `track_rejections`.
    pub fn record_rejection(&self) {
        self.rejected_tracked.store(true, Ordering::Relaxed);
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all gauges into one counter value.
    pub fn snapshot(&self) -> PoolCounters {
        let queued = self.queued.load(Ordering::Relaxed);
        let capacity = self.queue_capacity.load(Ordering::Relaxed);

        PoolCounters {
            core_size: self.core_size.load(Ordering::Relaxed),
            max_size: self.max_size.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            current_size: self.current_size.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            queued,
            queue_remaining: if capacity == 0 {
                None
            } else {
                Some(capacity.saturating_sub(queued))
            },
            rejected: if self.rejected_tracked.load(Ordering::Relaxed) {
                Some(self.rejected.load(Ordering::Relaxed))
            } else {
                None
            },
        }
    }
}

/// [`ManagedPool`] over a shared [`PoolGauges`] bundle.
pub struct GaugePool {
    name: String,
    pool_type: PoolType,
    gauges: Arc<PoolGauges>,
    healthy: AtomicBool,
    shutdown: AtomicBool,
    tags: HashMap<String, String>,
    priority: i32,
}

impl GaugePool {
    pub fn new(name: impl Into<String>, pool_type: PoolType, gauges: Arc<PoolGauges>) -> Self {
        Self {
            name: name.into(),
            pool_type,
            gauges,
            healthy: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            tags: HashMap::new(),
            priority: 100,
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Flip the pool's own health verdict.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Mark the pool as no longer accepting work.
    pub fn mark_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn gauges(&self) -> &Arc<PoolGauges> {
        &self.gauges
    }
}

impl ManagedPool for GaugePool {
    fn name(&self) -> &str {
        &self.name
    }

    fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    fn counters(&self) -> Result<PoolCounters> {
        Ok(self.gauges.snapshot())
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn tags(&self) -> HashMap<String, String> {
        self.tags.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
