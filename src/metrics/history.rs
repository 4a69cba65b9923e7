//! Capped per-pool history log and on-demand statistics

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StatusSnapshot;

/// Default history cap when none is configured.
const DEFAULT_MAX_RECORDS: usize = 2000;

/// Lighter projection of a snapshot kept in the history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    pub pool_name: String,
    pub captured_at: DateTime<Utc>,
    pub utilization: f64,
    pub queue_utilization: f64,
    pub active: usize,
    pub queued: usize,
    pub completed: u64,
    pub rejected: u64,
}

impl MetricRecord {
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        Self {
            pool_name: snapshot.pool_name.clone(),
            captured_at: snapshot.captured_at,
            utilization: snapshot.utilization,
            queue_utilization: snapshot.queue_utilization,
            active: snapshot.active,
            queued: snapshot.queued,
            completed: snapshot.completed,
            rejected: snapshot.rejected,
        }
    }
}

/// Aggregates over one pool's records inside a queried range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub pool_name: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub sample_count: usize,
    pub avg_utilization: f64,
    pub min_utilization: f64,
    pub max_utilization: f64,
    pub avg_queue_utilization: f64,
    pub min_queue_utilization: f64,
    pub max_queue_utilization: f64,
    pub avg_active: f64,
    pub min_active: usize,
    pub max_active: usize,
    /// Completed-task growth between the first and last sample in range.
    /// `None` when the range holds fewer than two samples.
    pub completed_delta: Option<u64>,
}

/// Append log of [`MetricRecord`]s per pool, capped in length and
/// optionally pruned by age.
///
/// Appends happen only from the engine's collection path; queries filter or
/// slice copies and never mutate. When an insert pushes a pool past the
/// cap, the oldest excess is drained in one bulk trim.
pub struct MetricsHistory {
    max_records: usize,
    records: DashMap<String, Vec<MetricRecord>>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }

    /// Create a history keeping at most `max_records` per pool (min 1).
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            max_records: max_records.max(1),
            records: DashMap::new(),
        }
    }

    /// Project and append one snapshot to its pool's log.
    pub fn collect(&self, snapshot: &StatusSnapshot) {
        let mut entry = self
            .records
            .entry(snapshot.pool_name.clone())
            .or_default();
        entry.push(MetricRecord::from_snapshot(snapshot));

        let len = entry.len();
        if len > self.max_records {
            entry.drain(..len - self.max_records);
        }
    }

    /// Records for `pool` captured in `[start, end]`, oldest first.
    pub fn metrics_in_range(
        &self,
        pool: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MetricRecord> {
        self.records
            .get(pool)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.captured_at >= start && r.captured_at <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The most recent `count` records for `pool`, oldest first.
    pub fn recent_metrics(&self, pool: &str, count: usize) -> Vec<MetricRecord> {
        self.records
            .get(pool)
            .map(|records| {
                let skip = records.len().saturating_sub(count);
                records[skip..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Aggregate `pool`'s records inside `[start, end]` in one pass.
    ///
    /// `None` means no sample fell in the range; that is a "no data"
    /// signal, deliberately distinct from a report full of zeros.
    pub fn calculate_statistics(
        &self,
        pool: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<StatisticsReport> {
        let guard = self.records.get(pool)?;
        let in_range: Vec<&MetricRecord> = guard
            .iter()
            .filter(|r| r.captured_at >= start && r.captured_at <= end)
            .collect();

        let first = in_range.first()?;
        let mut report = StatisticsReport {
            pool_name: pool.to_string(),
            period_start: start,
            period_end: end,
            sample_count: in_range.len(),
            avg_utilization: 0.0,
            min_utilization: first.utilization,
            max_utilization: first.utilization,
            avg_queue_utilization: 0.0,
            min_queue_utilization: first.queue_utilization,
            max_queue_utilization: first.queue_utilization,
            avg_active: 0.0,
            min_active: first.active,
            max_active: first.active,
            completed_delta: None,
        };

        let mut utilization_sum = 0.0;
        let mut queue_sum = 0.0;
        let mut active_sum = 0usize;
        for record in &in_range {
            utilization_sum += record.utilization;
            queue_sum += record.queue_utilization;
            active_sum += record.active;

            report.min_utilization = report.min_utilization.min(record.utilization);
            report.max_utilization = report.max_utilization.max(record.utilization);
            report.min_queue_utilization =
                report.min_queue_utilization.min(record.queue_utilization);
            report.max_queue_utilization =
                report.max_queue_utilization.max(record.queue_utilization);
            report.min_active = report.min_active.min(record.active);
            report.max_active = report.max_active.max(record.active);
        }

        let count = in_range.len() as f64;
        report.avg_utilization = utilization_sum / count;
        report.avg_queue_utilization = queue_sum / count;
        report.avg_active = active_sum as f64 / count;

        if in_range.len() > 1 {
            // Counters can restart with the pool; clamp instead of wrapping.
            let last = in_range[in_range.len() - 1];
            report.completed_delta = Some(last.completed.saturating_sub(first.completed));
        }

        Some(report)
    }

    /// Drop records older than `cutoff` across all pools; returns how many
    /// were removed.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut pruned = 0;
        for mut entry in self.records.iter_mut() {
            let before = entry.len();
            entry.retain(|r| r.captured_at >= cutoff);
            pruned += before - entry.len();
        }
        if pruned > 0 {
            debug!(pruned, "dropped aged-out history records");
        }
        pruned
    }

    /// Forget a pool's log entirely. Returns whether one existed.
    pub fn remove_pool(&self, pool: &str) -> bool {
        self.records.remove(pool).is_some()
    }

    /// Records currently held for `pool`.
    pub fn record_count(&self, pool: &str) -> usize {
        self.records.get(pool).map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new()
    }
}
