//! Per-pool metric retention
//!
//! Two stores with different jobs:
//!
//! - **Series**: bounded rolling window with running aggregates, answers
//!   average/peak in O(1) for dashboards polling at high rates
//! - **History**: capped append log, answers arbitrary range queries and
//!   on-demand statistics
//!
//! Both are fed the same [`StatusSnapshot`](crate::StatusSnapshot) by the
//! engine's collection step and never sample pools themselves.

pub mod history;
pub mod series;

pub use history::{MetricRecord, MetricsHistory, StatisticsReport};
pub use series::MetricsSeries;
