//! Engine orchestration
//!
//! [`MonitorEngine`] owns the pool and strategy registries, the per-pool
//! metrics stores, the alert manager, and a lifecycle state machine. While
//! running, a scheduler task drives one collection/alert pass per
//! configured interval; callers can also run passes manually and query
//! status, history and statistics at any time.
//!
//! ## Pass anatomy
//!
//! For every registered pool, independently: read live counters, build a
//! [`StatusSnapshot`], feed series and history, evaluate alert thresholds,
//! then run the strategy pipeline in priority order. A pool whose counter
//! read fails is skipped for that pass and retried on the next one; a
//! failing strategy or alert handler degrades only its own signal.
//!
//! ## Lifecycle
//!
//! ```text
//! NotStarted ──start──▶ Running ──pause──▶ Paused
//!      ▲                ▲  │ ▲              │
//!      │           start│  │ └───resume─────┘
//!      │                │  stop
//!      └── new()     Error  ▼
//!                       ▲ Stopped ──start──▶ Running
//!                       │
//!                 pass panicked
//! ```
//!
//! Transitions happen only through explicit calls under one lock; a panic
//! escaping a scheduled pass is the single exception and flips the state
//! to `Error` while ticking continues, so an explicit `start` recovers.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::StatusSnapshot;
use crate::alerts::{AlertConfig, AlertEvent, AlertHandler, AlertManager};
use crate::config::{ConfigResult, MonitorConfig};
use crate::context::MonitorContext;
use crate::metrics::{MetricRecord, MetricsHistory, MetricsSeries, StatisticsReport};
use crate::pool::{ManagedPool, PoolType};
use crate::strategy::{MonitorResult, MonitorStrategy, StrategyFactory};

/// Lifecycle state of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitoringState {
    NotStarted,
    Running,
    Paused,
    Stopped,
    Error,
}

impl fmt::Display for MonitoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MonitoringState::NotStarted => "not started",
            MonitoringState::Running => "running",
            MonitoringState::Paused => "paused",
            MonitoringState::Stopped => "stopped",
            MonitoringState::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Why a registration was refused. A refusal leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The pool's name is empty or whitespace-only.
    InvalidName,
    /// Another pool already holds this name.
    AlreadyRegistered(String),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidName => {
                write!(f, "pool name must not be empty")
            }
            RegistrationError::AlreadyRegistered(name) => {
                write!(f, "pool '{name}' is already registered")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

const LAST_PASS_NEVER: i64 = i64::MIN;

/// Live engine-wide counters, updated once per completed pass.
///
/// Shared with every [`MonitorContext`] so strategies can read them
/// mid-pass. Readers may observe a pass that is still in flight.
#[derive(Debug)]
pub struct EngineStats {
    cycles: AtomicU64,
    alerts: AtomicU64,
    latency_total_ms: AtomicU64,
    latency_samples: AtomicU64,
    last_pass_ms: AtomicI64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            latency_total_ms: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
            last_pass_ms: AtomicI64::new(LAST_PASS_NEVER),
        }
    }

    /// Completed collection/alert passes.
    pub fn monitor_cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Cumulative alerts: threshold events dispatched plus alerting
    /// strategy verdicts.
    pub fn total_alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    /// Mean pass latency in milliseconds; zero before the first pass.
    pub fn avg_pass_latency_ms(&self) -> f64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0.0;
        }
        self.latency_total_ms.load(Ordering::Relaxed) as f64 / samples as f64
    }

    /// When the most recent pass finished; `None` before the first pass.
    pub fn last_pass_at(&self) -> Option<DateTime<Utc>> {
        let millis = self.last_pass_ms.load(Ordering::Relaxed);
        if millis == LAST_PASS_NEVER {
            return None;
        }
        DateTime::from_timestamp_millis(millis)
    }

    fn record_pass(&self, latency_ms: u64, alerts: u64, finished_at: DateTime<Utc>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.alerts.fetch_add(alerts, Ordering::Relaxed);
        self.latency_total_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        self.last_pass_ms.store(finished_at.timestamp_millis(), Ordering::Relaxed);
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the engine counters.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatistics {
    pub registered_pools: usize,
    pub monitor_cycles: u64,
    pub total_alerts: u64,
    pub avg_pass_latency_ms: f64,
    pub last_pass_at: Option<DateTime<Utc>>,
    pub state: MonitoringState,
}

enum SchedulerCommand {
    Shutdown,
}

struct SchedulerSlot {
    command_tx: mpsc::Sender<SchedulerCommand>,
    task: JoinHandle<()>,
}

struct Lifecycle {
    state: MonitoringState,
    scheduler: Option<SchedulerSlot>,
}

struct EngineInner {
    config: Arc<MonitorConfig>,
    stats: Arc<EngineStats>,
    pools: DashMap<String, Arc<dyn ManagedPool>>,
    series: DashMap<String, Arc<MetricsSeries>>,
    history: MetricsHistory,
    alerts: AlertManager,
    strategies: DashMap<String, Arc<dyn MonitorStrategy>>,
    factory: StrategyFactory,
    query_permits: Arc<Semaphore>,
    lifecycle: Mutex<Lifecycle>,
}

/// The monitoring orchestrator. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct MonitorEngine {
    inner: Arc<EngineInner>,
}

impl MonitorEngine {
    /// Build an engine after validating the configuration.
    pub fn new(config: MonitorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config))
    }

    fn assemble(config: MonitorConfig) -> Self {
        let config = Arc::new(config);
        Self {
            inner: Arc::new(EngineInner {
                stats: Arc::new(EngineStats::new()),
                pools: DashMap::new(),
                series: DashMap::new(),
                history: MetricsHistory::with_max_records(config.max_history_records),
                alerts: AlertManager::new(),
                strategies: DashMap::new(),
                factory: StrategyFactory::new(),
                query_permits: Arc::new(Semaphore::new(config.async_query_workers)),
                lifecycle: Mutex::new(Lifecycle {
                    state: MonitoringState::NotStarted,
                    scheduler: None,
                }),
                config,
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Fresh pass context wired to this engine's configuration and
    /// counters, for use with [`MonitorEngine::run_monitor_check`].
    pub fn new_context(&self) -> MonitorContext {
        self.inner.fresh_context()
    }

    // ---- registration -----------------------------------------------

    /// Register a pool for monitoring.
    ///
    /// Also creates the pool's rolling series and attaches the strategy
    /// subset tuned to its type, skipping strategy names that are already
    /// registered.
    #[instrument(skip(self, pool), fields(pool = %pool.name()))]
    pub fn register_pool(&self, pool: Arc<dyn ManagedPool>) -> Result<(), RegistrationError> {
        let name = pool.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistrationError::InvalidName);
        }

        match self.inner.pools.entry(name.clone()) {
            Entry::Occupied(_) => Err(RegistrationError::AlreadyRegistered(name)),
            Entry::Vacant(slot) => {
                let pool_type = pool.pool_type();
                slot.insert(pool);
                self.inner.series.insert(
                    name.clone(),
                    Arc::new(MetricsSeries::with_capacity(self.inner.config.max_series_snapshots)),
                );
                let attached = self.inner.attach_type_strategies(pool_type);
                info!(?pool_type, attached, "pool registered");
                Ok(())
            }
        }
    }

    /// Remove a pool along with its series and history. `false` when the
    /// name was not registered. The pool's alert config survives so a
    /// re-registered pool alerts unchanged.
    #[instrument(skip(self))]
    pub fn unregister_pool(&self, name: &str) -> bool {
        if self.inner.pools.remove(name).is_none() {
            debug!("unregister ignored; pool not registered");
            return false;
        }
        self.inner.series.remove(name);
        self.inner.history.remove_pool(name);
        info!("pool unregistered");
        true
    }

    // ---- alerting ---------------------------------------------------

    /// Install or replace a pool's alert thresholds. Resets that pool's
    /// debounce history.
    pub fn configure_alert(&self, pool: impl Into<String>, config: AlertConfig) {
        self.inner.alerts.configure(pool, config);
    }

    pub fn alert_config(&self, pool: &str) -> Option<AlertConfig> {
        self.inner.alerts.config(pool)
    }

    pub fn add_alert_handler(&self, handler: Arc<dyn AlertHandler>) {
        self.inner.alerts.add_handler(handler);
    }

    /// Broadcast receiver over every dispatched alert event.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertEvent> {
        self.inner.alerts.subscribe()
    }

    // ---- strategies -------------------------------------------------

    /// Register a strategy under its name, replacing any existing one.
    pub fn add_strategy(&self, strategy: Arc<dyn MonitorStrategy>) {
        let name = strategy.name().to_string();
        debug!(strategy = %name, priority = strategy.priority(), "strategy added");
        self.inner.strategies.insert(name, strategy);
    }

    pub fn remove_strategy(&self, name: &str) -> bool {
        self.inner.strategies.remove(name).is_some()
    }

    /// Names of currently registered strategies, sorted.
    pub fn strategy_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.inner.strategies.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn strategy_factory(&self) -> &StrategyFactory {
        &self.inner.factory
    }

    // ---- queries ----------------------------------------------------

    /// Fresh snapshot of one pool, read from its live counters right now.
    pub fn get_status(&self, name: &str) -> Option<StatusSnapshot> {
        let pool = self.inner.pools.get(name)?;
        match pool.counters() {
            Ok(counters) => Some(StatusSnapshot::from_counters(name, &counters, Utc::now())),
            Err(e) => {
                warn!(pool = name, error = %e, "status read failed");
                None
            }
        }
    }

    /// Fresh snapshots of all pools; pools whose read fails are omitted.
    pub fn get_all_statuses(&self) -> HashMap<String, StatusSnapshot> {
        self.inner.collect_statuses(None)
    }

    /// Fresh snapshots of the named pools; unknown names are omitted.
    pub fn get_statuses(&self, names: &[String]) -> HashMap<String, StatusSnapshot> {
        self.inner.collect_statuses(Some(names))
    }

    /// Like [`MonitorEngine::get_all_statuses`], serviced by the bounded
    /// query pool so bulk reads never run inline on the caller.
    pub async fn get_all_statuses_async(&self) -> Result<HashMap<String, StatusSnapshot>> {
        let permit = Arc::clone(&self.inner.query_permits)
            .acquire_owned()
            .await
            .context("query pool is closed")?;
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _permit = permit;
            inner.collect_statuses(None)
        });
        task.await.context("status query task failed")
    }

    /// Async variant of [`MonitorEngine::get_statuses`].
    pub async fn get_statuses_async(&self, names: Vec<String>) -> Result<HashMap<String, StatusSnapshot>> {
        let permit = Arc::clone(&self.inner.query_permits)
            .acquire_owned()
            .await
            .context("query pool is closed")?;
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _permit = permit;
            inner.collect_statuses(Some(&names))
        });
        task.await.context("status query task failed")
    }

    /// Pools whose own health predicate holds and that are not shut down.
    pub fn healthy_pools(&self) -> Vec<String> {
        self.partition_by_health(true)
    }

    pub fn unhealthy_pools(&self) -> Vec<String> {
        self.partition_by_health(false)
    }

    fn partition_by_health(&self, want_healthy: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .pools
            .iter()
            .filter(|entry| {
                let healthy = entry.value().is_healthy() && !entry.value().is_shutdown();
                healthy == want_healthy
            })
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn get_recent_metrics(&self, pool: &str, count: usize) -> Vec<MetricRecord> {
        self.inner.history.recent_metrics(pool, count)
    }

    pub fn get_metrics_in_range(
        &self,
        pool: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MetricRecord> {
        self.inner.history.metrics_in_range(pool, start, end)
    }

    /// Aggregate report over a time range; `None` when no samples fall
    /// inside it.
    pub fn get_statistics(
        &self,
        pool: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<StatisticsReport> {
        self.inner.history.calculate_statistics(pool, start, end)
    }

    /// Rolling series of one pool; `None` until the pool is registered.
    pub fn get_metrics_series(&self, pool: &str) -> Option<Arc<MetricsSeries>> {
        self.inner.series.get(pool).map(|entry| Arc::clone(entry.value()))
    }

    // ---- passes -----------------------------------------------------

    /// Run one collection/alert pass with a caller-supplied context and
    /// return the strategy verdicts.
    #[instrument(skip(self, ctx), fields(session = %ctx.session_id()))]
    pub fn run_monitor_check(&self, ctx: &MonitorContext) -> Vec<MonitorResult> {
        self.inner.run_pass(ctx)
    }

    /// One full pass on the bounded query pool, with a fresh context.
    pub async fn run_monitor_check_async(&self) -> Result<Vec<MonitorResult>> {
        let permit = Arc::clone(&self.inner.query_permits)
            .acquire_owned()
            .await
            .context("query pool is closed")?;
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _permit = permit;
            let ctx = inner.fresh_context();
            inner.run_pass(&ctx)
        });
        task.await.context("monitor check task failed")
    }

    // ---- lifecycle --------------------------------------------------

    /// Arm the scheduler and enter `Running`. No-op while already
    /// running. From `Error` this re-arms recovery without touching
    /// collected data.
    #[instrument(skip(self))]
    pub fn start(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state == MonitoringState::Running {
            info!("start ignored; already running");
            return;
        }
        self.inner.arm_scheduler(&mut lifecycle);
        lifecycle.state = MonitoringState::Running;
        info!(interval = ?self.inner.config.monitor_interval, "monitoring started");
    }

    /// Cancel future passes; an in-flight pass completes. Keeps all
    /// registered state. Idempotent.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        EngineInner::halt_scheduler(&mut lifecycle);
        lifecycle.state = MonitoringState::Stopped;
        info!("monitoring stopped");
    }

    /// Suspend scheduling. Only valid while running; otherwise the state
    /// is left untouched.
    #[instrument(skip(self))]
    pub fn pause(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != MonitoringState::Running {
            debug!(state = %lifecycle.state, "pause ignored");
            return;
        }
        EngineInner::halt_scheduler(&mut lifecycle);
        lifecycle.state = MonitoringState::Paused;
        info!("monitoring paused");
    }

    /// Resume a paused engine; no-op in any other state.
    #[instrument(skip(self))]
    pub fn resume(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        match lifecycle.state {
            MonitoringState::Paused => {
                self.inner.arm_scheduler(&mut lifecycle);
                lifecycle.state = MonitoringState::Running;
                info!("monitoring resumed");
            }
            state => debug!(%state, "resume ignored"),
        }
    }

    pub fn get_state(&self) -> MonitoringState {
        self.inner.lifecycle.lock().state
    }

    pub fn get_engine_statistics(&self) -> EngineStatistics {
        EngineStatistics {
            registered_pools: self.inner.pools.len(),
            monitor_cycles: self.inner.stats.monitor_cycles(),
            total_alerts: self.inner.stats.total_alerts(),
            avg_pass_latency_ms: self.inner.stats.avg_pass_latency_ms(),
            last_pass_at: self.inner.stats.last_pass_at(),
            state: self.get_state(),
        }
    }

    /// Stop scheduling and wait for the scheduler task to wind down,
    /// aborting it once the configured grace period expires.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let slot = {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.state = MonitoringState::Stopped;
            lifecycle.scheduler.take()
        };

        let Some(SchedulerSlot { command_tx, mut task }) = slot else {
            debug!("shutdown with no scheduler armed");
            return Ok(());
        };

        let _ = command_tx.try_send(SchedulerCommand::Shutdown);
        drop(command_tx);

        match tokio::time::timeout(self.inner.config.shutdown_grace, &mut task).await {
            Ok(joined) => {
                joined.context("scheduler task panicked")?;
                info!("scheduler drained");
            }
            Err(_) => {
                task.abort();
                warn!(grace = ?self.inner.config.shutdown_grace, "scheduler did not drain in time; aborted");
            }
        }
        Ok(())
    }
}

impl Default for MonitorEngine {
    fn default() -> Self {
        Self::assemble(MonitorConfig::default())
    }
}

impl EngineInner {
    fn fresh_context(&self) -> MonitorContext {
        MonitorContext::new(Arc::clone(&self.config), Arc::clone(&self.stats))
    }

    fn attach_type_strategies(&self, pool_type: PoolType) -> usize {
        let mut attached = 0;
        for strategy in self.factory.strategies_for_pool_type(pool_type) {
            if let Entry::Vacant(slot) = self.strategies.entry(strategy.name().to_string()) {
                slot.insert(strategy);
                attached += 1;
            }
        }
        attached
    }

    fn collect_statuses(&self, filter: Option<&[String]>) -> HashMap<String, StatusSnapshot> {
        let now = Utc::now();
        let mut statuses = HashMap::new();

        let mut read_into = |name: &str, pool: &dyn ManagedPool| match pool.counters() {
            Ok(counters) => {
                statuses.insert(name.to_string(), StatusSnapshot::from_counters(name, &counters, now));
            }
            Err(e) => warn!(pool = name, error = %e, "status read failed"),
        };

        match filter {
            Some(names) => {
                for name in names {
                    if let Some(pool) = self.pools.get(name) {
                        read_into(name, pool.value().as_ref());
                    }
                }
            }
            None => {
                for entry in self.pools.iter() {
                    read_into(entry.key(), entry.value().as_ref());
                }
            }
        }
        statuses
    }

    /// Spawn the scheduler task unless one is already armed. Recovery
    /// from `Error` finds the task still alive and only flips the state.
    fn arm_scheduler(self: &Arc<Self>, lifecycle: &mut Lifecycle) {
        if lifecycle.scheduler.is_some() {
            return;
        }

        let (command_tx, mut command_rx) = mpsc::channel(1);
        let weak = Arc::downgrade(self);
        let period = self.config.monitor_interval;

        let task = tokio::spawn(async move {
            // The first tick completes immediately, so starting also
            // samples immediately.
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.run_scheduled_pass();
                    }
                    command = command_rx.recv() => match command {
                        Some(SchedulerCommand::Shutdown) | None => break,
                    },
                }
            }
            debug!("scheduler loop exited");
        });

        lifecycle.scheduler = Some(SchedulerSlot { command_tx, task });
    }

    /// Tell the scheduler to wind down after any in-flight pass. The task
    /// is never aborted here.
    fn halt_scheduler(lifecycle: &mut Lifecycle) {
        if let Some(slot) = lifecycle.scheduler.take() {
            let _ = slot.command_tx.try_send(SchedulerCommand::Shutdown);
            // Dropping the sender ends the loop even if the buffer was full.
        }
    }

    fn run_scheduled_pass(self: &Arc<Self>) {
        let ctx = self.fresh_context();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| self.run_pass(&ctx)));
        if let Err(panic) = outcome {
            error!(panic = panic_message(panic.as_ref()), "monitoring pass panicked");
            self.lifecycle.lock().state = MonitoringState::Error;
        }
    }

    /// The collection/alert pass shared by the scheduler and the manual
    /// check entry points.
    fn run_pass(&self, ctx: &MonitorContext) -> Vec<MonitorResult> {
        let started = Instant::now();
        let mut results = Vec::new();
        let mut alerts_fired: u64 = 0;

        // Snapshot both registries up front so handlers and strategies may
        // call back into the engine without holding map shards.
        let pools: Vec<(String, Arc<dyn ManagedPool>)> = self
            .pools
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        let mut strategies: Vec<Arc<dyn MonitorStrategy>> =
            self.strategies.iter().map(|entry| Arc::clone(entry.value())).collect();
        strategies.sort_by_key(|strategy| std::cmp::Reverse(strategy.priority()));

        for (name, pool) in &pools {
            let counters = match pool.counters() {
                Ok(counters) => counters,
                Err(e) => {
                    warn!(pool = %name, error = %e, "counter read failed; pool skipped this pass");
                    continue;
                }
            };
            let snapshot = StatusSnapshot::from_counters(name, &counters, Utc::now());

            if let Some(series) = self.series.get(name) {
                series.add_snapshot(snapshot.clone());
            }
            self.history.collect(&snapshot);

            alerts_fired += self.alerts.check_and_alert(name, &snapshot) as u64;

            for strategy in &strategies {
                if !strategy.supports(pool.as_ref()) {
                    continue;
                }
                match strategy.evaluate(pool.as_ref(), ctx) {
                    Ok(result) => {
                        if result.should_alert {
                            alerts_fired += 1;
                        }
                        results.push(result);
                    }
                    Err(e) => {
                        warn!(
                            strategy = strategy.name(),
                            pool = %name,
                            error = %e,
                            "strategy evaluation failed; skipped for this pass"
                        );
                    }
                }
            }
        }

        if let Some(retention) = self.config.history_retention {
            self.prune_history(retention);
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        self.stats.record_pass(latency_ms, alerts_fired, Utc::now());
        debug!(
            session = %ctx.session_id(),
            pools = pools.len(),
            verdicts = results.len(),
            alerts = alerts_fired,
            latency_ms,
            "pass complete"
        );
        results
    }

    fn prune_history(&self, retention: Duration) {
        let Ok(window) = TimeDelta::from_std(retention) else {
            return;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(window) else {
            return;
        };
        self.history.prune_older_than(cutoff);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
