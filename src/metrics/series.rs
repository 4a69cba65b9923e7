//! Bounded rolling window of snapshots with O(1) aggregates

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::StatusSnapshot;

/// Ring capacity used when none is configured.
const DEFAULT_CAPACITY: usize = 1000;

/// Rolling window of one pool's snapshots.
///
/// The running total and peak are maintained incrementally on every insert,
/// so `average` and `peak` never walk the ring. All three live behind one
/// lock because they must change together: evicting a snapshot without
/// subtracting its utilization would corrupt the average.
///
/// Writers are serialized; readers share the lock. The engine is the only
/// writer (its per-pool collection path), queries may read from any task.
pub struct MetricsSeries {
    capacity: usize,
    inner: RwLock<SeriesInner>,
}

#[derive(Default)]
struct SeriesInner {
    snapshots: VecDeque<StatusSnapshot>,
    total_utilization: f64,
    peak_utilization: f64,
}

impl MetricsSeries {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a series holding at most `capacity` snapshots (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(SeriesInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a snapshot, evicting the oldest one first when full.
    ///
    /// The evicted snapshot's utilization leaves the running total before
    /// the new one enters it; peak only ever ratchets up until `clear`.
    pub fn add_snapshot(&self, snapshot: StatusSnapshot) {
        let mut inner = self.inner.write();

        if inner.snapshots.len() >= self.capacity {
            if let Some(evicted) = inner.snapshots.pop_front() {
                inner.total_utilization -= evicted.utilization;
            }
        }

        inner.total_utilization += snapshot.utilization;
        if snapshot.utilization > inner.peak_utilization {
            inner.peak_utilization = snapshot.utilization;
        }
        inner.snapshots.push_back(snapshot);
    }

    /// Average utilization over the current window; 0.0 when empty.
    pub fn average(&self) -> f64 {
        let inner = self.inner.read();
        if inner.snapshots.is_empty() {
            0.0
        } else {
            inner.total_utilization / inner.snapshots.len() as f64
        }
    }

    /// Highest utilization observed since creation or the last `clear`.
    pub fn peak(&self) -> f64 {
        self.inner.read().peak_utilization
    }

    pub fn len(&self) -> usize {
        self.inner.read().snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().snapshots.is_empty()
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.inner.read().snapshots.back().cloned()
    }

    /// Defensive copy of the whole window, oldest first.
    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        self.inner.read().snapshots.iter().cloned().collect()
    }

    /// Average utilization of snapshots captured in `[start, end]`.
    /// `None` when no snapshot falls in the range.
    pub fn average_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
        let inner = self.inner.read();
        let mut sum = 0.0;
        let mut count = 0usize;
        for snapshot in &inner.snapshots {
            if snapshot.captured_at >= start && snapshot.captured_at <= end {
                sum += snapshot.utilization;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Peak utilization of snapshots captured in `[start, end]`.
    /// `None` when no snapshot falls in the range.
    pub fn peak_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
        let inner = self.inner.read();
        inner
            .snapshots
            .iter()
            .filter(|s| s.captured_at >= start && s.captured_at <= end)
            .map(|s| s.utilization)
            .fold(None, |peak, u| {
                Some(match peak {
                    Some(p) if p >= u => p,
                    _ => u,
                })
            })
    }

    /// Drop every snapshot and reset both aggregates.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.snapshots.clear();
        inner.total_utilization = 0.0;
        inner.peak_utilization = 0.0;
    }
}

impl Default for MetricsSeries {
    fn default() -> Self {
        Self::new()
    }
}
