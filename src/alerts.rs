//! Threshold alerting with per-rule debounce
//!
//! The [`AlertManager`] compares each snapshot against the owning pool's
//! [`AlertConfig`]. Every rule type debounces independently per pool, so a
//! queue alert never suppresses a utilization alert and two pools never
//! share a suppression window. Fired events go to the registered handlers
//! in order and to a broadcast channel hosts can subscribe to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::StatusSnapshot;

/// Capacity of the alert broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fixed set of threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    HighUtilization,
    QueueFull,
    HighQueueUtilization,
    TaskRejected,
    TooManyActiveThreads,
}

impl AlertType {
    pub fn describe(&self) -> &'static str {
        match self {
            AlertType::HighUtilization => "pool utilization above threshold",
            AlertType::QueueFull => "queue length above threshold",
            AlertType::HighQueueUtilization => "queue utilization above threshold",
            AlertType::TaskRejected => "rejected task count above threshold",
            AlertType::TooManyActiveThreads => "active thread count above threshold",
        }
    }
}

/// Per-pool alert thresholds and suppression window.
///
/// A zero (or negative, for the ratio fields) threshold disables that rule;
/// `max_active` is disabled by `None` so that zero remains a usable
/// threshold ("alert on any activity").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    /// 0-100 scale, compared against `StatusSnapshot::utilization`.
    pub max_utilization: f64,
    pub max_queue_size: usize,
    /// 0-100 scale, compared against `StatusSnapshot::queue_utilization`.
    pub max_queue_utilization: f64,
    pub max_rejected: u64,
    pub max_active: Option<usize>,
    /// Minimum gap between two alerts of the same type for the same pool.
    pub debounce: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_utilization: 80.0,
            max_queue_size: 1000,
            max_queue_utilization: 80.0,
            max_rejected: 10,
            max_active: None,
            debounce: Duration::from_secs(300),
        }
    }
}

/// A single fired alert for one pool and rule type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub pool_name: String,
    pub alert_type: AlertType,
    pub message: String,
    pub snapshot: StatusSnapshot,
    pub timestamp: DateTime<Utc>,
}

/// Callback invoked for every dispatched alert.
///
/// Handlers run on the monitoring pass; keep them fast and non-blocking.
/// A failing handler is logged and skipped, it never stops the other
/// handlers or the pass.
pub trait AlertHandler: Send + Sync {
    fn handle(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

impl<F> AlertHandler for F
where
    F: Fn(&AlertEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &AlertEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Evaluates snapshots against per-pool configs and dispatches events.
pub struct AlertManager {
    configs: DashMap<String, AlertConfig>,
    last_fired: DashMap<String, HashMap<AlertType, DateTime<Utc>>>,
    handlers: RwLock<Vec<Arc<dyn AlertHandler>>>,
    events_tx: broadcast::Sender<AlertEvent>,
}

impl AlertManager {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            configs: DashMap::new(),
            last_fired: DashMap::new(),
            handlers: RwLock::new(Vec::new()),
            events_tx,
        }
    }

    /// Install or replace `pool`'s alert config.
    ///
    /// Replacing a config resets the pool's suppression state; the next
    /// breach of any rule fires immediately.
    pub fn configure(&self, pool: impl Into<String>, config: AlertConfig) {
        let pool = pool.into();
        debug!(pool = %pool, "alert config installed");
        self.configs.insert(pool.clone(), config);
        self.last_fired.insert(pool, HashMap::new());
    }

    pub fn config(&self, pool: &str) -> Option<AlertConfig> {
        self.configs.get(pool).map(|c| c.clone())
    }

    /// Append a handler; handlers run in registration order.
    pub fn add_handler(&self, handler: Arc<dyn AlertHandler>) {
        self.handlers.write().push(handler);
    }

    /// Receiver for all events dispatched from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events_tx.subscribe()
    }

    /// Evaluate one snapshot against `pool`'s config; returns the number of
    /// events actually dispatched (post-debounce).
    ///
    /// No config, or a disabled one, means no alerting for that pool.
    pub fn check_and_alert(&self, pool: &str, snapshot: &StatusSnapshot) -> usize {
        let Some(config) = self.configs.get(pool).map(|c| c.clone()) else {
            return 0;
        };
        if !config.enabled {
            return 0;
        }

        let mut breaches: Vec<(AlertType, String)> = Vec::new();

        if config.max_utilization > 0.0 && snapshot.utilization > config.max_utilization {
            breaches.push((
                AlertType::HighUtilization,
                format!(
                    "pool '{}' utilization {:.1}% exceeds threshold {:.1}%",
                    pool, snapshot.utilization, config.max_utilization
                ),
            ));
        }

        if config.max_queue_size > 0 && snapshot.queued > config.max_queue_size {
            breaches.push((
                AlertType::QueueFull,
                format!(
                    "pool '{}' queue length {} exceeds threshold {}",
                    pool, snapshot.queued, config.max_queue_size
                ),
            ));
        }

        if config.max_queue_utilization > 0.0
            && snapshot.queue_utilization > config.max_queue_utilization
        {
            breaches.push((
                AlertType::HighQueueUtilization,
                format!(
                    "pool '{}' queue utilization {:.1}% exceeds threshold {:.1}%",
                    pool, snapshot.queue_utilization, config.max_queue_utilization
                ),
            ));
        }

        // An untracked rejection counter reads zero; it must never imply
        // "confirmed zero rejections", so the rule only sees tracked pools.
        if config.max_rejected > 0
            && snapshot.rejected_tracked
            && snapshot.rejected > config.max_rejected
        {
            breaches.push((
                AlertType::TaskRejected,
                format!(
                    "pool '{}' rejected {} tasks, threshold {}",
                    pool, snapshot.rejected, config.max_rejected
                ),
            ));
        }

        if let Some(max_active) = config.max_active {
            if snapshot.active > max_active {
                breaches.push((
                    AlertType::TooManyActiveThreads,
                    format!(
                        "pool '{}' has {} active threads, threshold {}",
                        pool, snapshot.active, max_active
                    ),
                ));
            }
        }

        let mut dispatched = 0;
        for (alert_type, message) in breaches {
            if self.trigger(pool, alert_type, message, snapshot, &config) {
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Dispatch one alert unless its (pool, type) suppression window is
    /// still open. Returns whether the event went out.
    fn trigger(
        &self,
        pool: &str,
        alert_type: AlertType,
        message: String,
        snapshot: &StatusSnapshot,
        config: &AlertConfig,
    ) -> bool {
        let now = Utc::now();
        let window = TimeDelta::from_std(config.debounce).unwrap_or(TimeDelta::MAX);

        {
            let mut fired = self.last_fired.entry(pool.to_string()).or_default();
            if let Some(last) = fired.get(&alert_type) {
                let still_suppressed = match last.checked_add_signed(window) {
                    Some(expiry) => now < expiry,
                    None => true,
                };
                if still_suppressed {
                    debug!(pool = %pool, alert_type = ?alert_type, "alert suppressed by debounce");
                    return false;
                }
            }
            fired.insert(alert_type, now);
        }

        let event = AlertEvent {
            pool_name: pool.to_string(),
            alert_type,
            message,
            snapshot: snapshot.clone(),
            timestamp: now,
        };

        warn!(
            pool = %event.pool_name,
            alert_type = ?event.alert_type,
            message = %event.message,
            "alert dispatched"
        );

        let handlers: Vec<Arc<dyn AlertHandler>> = self.handlers.read().clone();
        for handler in handlers {
            if let Err(e) = handler.handle(&event) {
                error!(pool = %event.pool_name, alert_type = ?event.alert_type, "alert handler failed: {e:#}");
            }
        }

        // It's fine if nobody subscribed to the broadcast side.
        let _ = self.events_tx.send(event);
        true
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}
