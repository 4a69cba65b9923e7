//! Engine configuration
//!
//! One explicit struct with validated fields; presets cover the common
//! deployment shapes. Hosts that load configuration from files deserialize
//! into [`MonitorConfig`] directly, every field falls back to the default
//! preset value.

use std::fmt;
use std::time::Duration;

/// Result type alias for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid configuration values, reported before the engine runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The pass interval must be non-zero
    ZeroMonitorInterval,

    /// The rolling series must hold at least one snapshot
    ZeroSeriesCapacity,

    /// The history log must hold at least one record
    ZeroHistoryCapacity,

    /// At least one async query permit is required
    ZeroQueryWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroMonitorInterval => {
                write!(f, "monitor interval must be greater than zero")
            }
            ConfigError::ZeroSeriesCapacity => {
                write!(f, "series snapshot capacity must be greater than zero")
            }
            ConfigError::ZeroHistoryCapacity => {
                write!(f, "history record capacity must be greater than zero")
            }
            ConfigError::ZeroQueryWorkers => {
                write!(f, "async query worker count must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MonitorConfig {
    /// Interval between two collection/alert passes
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval: Duration,

    /// Ring capacity of each pool's rolling metrics series
    #[serde(default = "default_series_snapshots")]
    pub max_series_snapshots: usize,

    /// Cap on each pool's history log
    #[serde(default = "default_history_records")]
    pub max_history_records: usize,

    /// Age bound for history records; `None` disables time-based pruning
    #[serde(default)]
    pub history_retention: Option<Duration>,

    /// Concurrent permits for async query calls
    #[serde(default = "default_query_workers")]
    pub async_query_workers: usize,

    /// How long `shutdown` waits for the scheduler before aborting it
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: Duration,
}

fn default_monitor_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_series_snapshots() -> usize {
    1000
}

fn default_history_records() -> usize {
    2000
}

fn default_query_workers() -> usize {
    2
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_interval: default_monitor_interval(),
            max_series_snapshots: default_series_snapshots(),
            max_history_records: default_history_records(),
            history_retention: None,
            async_query_workers: default_query_workers(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl MonitorConfig {
    /// Tight one-second cadence for pools that change fast.
    pub fn high_frequency() -> Self {
        Self {
            monitor_interval: Duration::from_secs(1),
            ..Self::default()
        }
    }

    /// Relaxed one-minute cadence for stable background pools.
    pub fn low_frequency() -> Self {
        Self {
            monitor_interval: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Request-serving applications: short cadence, bounded history age.
    pub fn web_application() -> Self {
        Self {
            monitor_interval: Duration::from_secs(3),
            history_retention: Some(Duration::from_secs(60 * 60)),
            ..Self::default()
        }
    }

    /// Long-running batch work: slow cadence, deep history.
    pub fn batch_processing() -> Self {
        Self {
            monitor_interval: Duration::from_secs(10),
            max_history_records: 5000,
            ..Self::default()
        }
    }

    /// Latency-sensitive pools: fast cadence, wide rolling window, quick
    /// teardown.
    pub fn real_time() -> Self {
        Self {
            monitor_interval: Duration::from_secs(1),
            max_series_snapshots: 2000,
            shutdown_grace: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Check all field bounds at once.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.monitor_interval.is_zero() {
            return Err(ConfigError::ZeroMonitorInterval);
        }
        if self.max_series_snapshots == 0 {
            return Err(ConfigError::ZeroSeriesCapacity);
        }
        if self.max_history_records == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if self.async_query_workers == 0 {
            return Err(ConfigError::ZeroQueryWorkers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = MonitorConfig::default();
        assert_eq!(config.monitor_interval, Duration::from_secs(5));
        assert_eq!(config.max_series_snapshots, 1000);
        assert_eq!(config.max_history_records, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn all_presets_validate() {
        for config in [
            MonitorConfig::high_frequency(),
            MonitorConfig::low_frequency(),
            MonitorConfig::web_application(),
            MonitorConfig::batch_processing(),
            MonitorConfig::real_time(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
    }

    #[test]
    fn preset_cadences() {
        assert_eq!(
            MonitorConfig::high_frequency().monitor_interval,
            Duration::from_secs(1)
        );
        assert_eq!(
            MonitorConfig::low_frequency().monitor_interval,
            Duration::from_secs(60)
        );
        assert_eq!(MonitorConfig::batch_processing().max_history_records, 5000);
        assert!(MonitorConfig::web_application().history_retention.is_some());
    }

    #[test]
    fn zero_fields_are_rejected() {
        let mut config = MonitorConfig::default();
        config.monitor_interval = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroMonitorInterval));

        let mut config = MonitorConfig::default();
        config.max_series_snapshots = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSeriesCapacity));

        let mut config = MonitorConfig::default();
        config.max_history_records = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroHistoryCapacity));

        let mut config = MonitorConfig::default();
        config.async_query_workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroQueryWorkers));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"max_history_records": 10}"#)
            .expect("partial config should deserialize");
        assert_eq!(config.max_history_records, 10);
        assert_eq!(config.monitor_interval, Duration::from_secs(5));
    }
}
