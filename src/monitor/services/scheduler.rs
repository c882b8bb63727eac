//! Probe cycle scheduling under a global concurrency cap.
//!
//! A cycle builds one task per service and runs them on a fixed number of
//! workers that claim tasks from a shared queue. Multi-endpoint services are
//! probed sequentially in a per-cycle order and stop at the first `down`
//! endpoint; the remaining endpoints receive a synthetic short-circuited
//! entry instead of a probe. At most one cycle runs at a time: a tick that
//! finds a cycle in flight is counted as skipped and dropped.

use crate::monitor::domain::{AuthStatus, CheckResult, Service, ServiceId};
use crate::monitor::ports::{EndpointOrdering, EndpointProber};
use crate::monitor::services::HistoryStore;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;
use mockable::Clock;
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cycle interval and worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    interval: Duration,
    concurrency: usize,
}

impl SchedulerSettings {
    /// Creates settings.
    ///
    /// A zero concurrency is raised to one worker and a zero interval to one
    /// millisecond.
    #[must_use]
    pub fn new(interval: Duration, concurrency: usize) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            concurrency: concurrency.max(1),
        }
    }

    /// Returns the cycle interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the global worker cap.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), 8)
    }
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Time the cycle started.
    pub started_at: DateTime<Utc>,
    /// Time the cycle finished.
    pub finished_at: DateTime<Utc>,
    /// Services processed.
    pub services: usize,
    /// Endpoints actually probed.
    pub probed: usize,
    /// Endpoints that received a short-circuited entry.
    pub short_circuited: usize,
    /// Service tasks that panicked.
    pub failed_services: usize,
}

/// Result of asking the scheduler to start a cycle.
#[derive(Debug)]
pub enum CycleTrigger {
    /// A cycle was started; the handle resolves to its report.
    Started(JoinHandle<CycleReport>),
    /// A cycle was already in flight, so this tick was skipped.
    Skipped {
        /// Consecutive skips including this one.
        consecutive_skips: u64,
    },
}

/// Scheduler counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleDiagnostics {
    /// Ticks skipped since the last completed cycle.
    pub consecutive_skips: u64,
    /// Ticks skipped since start-up.
    pub total_skips: u64,
    /// Whether a cycle is currently running.
    pub cycle_in_flight: bool,
    /// Elapsed time of the running cycle, in milliseconds.
    pub in_flight_elapsed_ms: Option<u64>,
    /// Completion time of the last cycle.
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Time the next regular cycle is due.
    pub next_cycle_at: Option<DateTime<Utc>>,
    /// Cycles completed since start-up.
    pub cycles_completed: u64,
}

#[derive(Debug, Default)]
struct CycleState {
    consecutive_skips: u64,
    total_skips: u64,
    in_flight_since: Option<DateTime<Utc>>,
    last_cycle_at: Option<DateTime<Utc>>,
    next_cycle_at: Option<DateTime<Utc>>,
    cycles_completed: u64,
}

#[derive(Debug, Default)]
struct CycleTally {
    probed: AtomicUsize,
    short_circuited: AtomicUsize,
    failed_services: AtomicUsize,
}

/// Drives probe cycles and owns every write to the history store.
pub struct Scheduler<P, C>
where
    P: EndpointProber,
    C: Clock + Send + Sync,
{
    prober: Arc<P>,
    history: Arc<HistoryStore<C>>,
    ordering: Arc<dyn EndpointOrdering>,
    clock: Arc<C>,
    settings: SchedulerSettings,
    services: RwLock<Arc<Vec<Service>>>,
    cycle_active: AtomicBool,
    state: Mutex<CycleState>,
}

impl<P, C> Scheduler<P, C>
where
    P: EndpointProber,
    C: Clock + Send + Sync,
{
    /// Creates a scheduler with no services; see
    /// [`Scheduler::replace_services`].
    #[must_use]
    pub fn new(
        prober: Arc<P>,
        history: Arc<HistoryStore<C>>,
        ordering: Arc<dyn EndpointOrdering>,
        clock: Arc<C>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            prober,
            history,
            ordering,
            clock,
            settings,
            services: RwLock::new(Arc::new(Vec::new())),
            cycle_active: AtomicBool::new(false),
            state: Mutex::new(CycleState::default()),
        }
    }

    /// Replaces the monitored services wholesale.
    ///
    /// History series are initialized for newly seen endpoints; existing
    /// series are kept.
    pub fn replace_services(&self, services: Vec<Service>) {
        for service in &services {
            for key in service.endpoint_keys() {
                self.history.initialize(key);
            }
        }
        *self.services.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(services);
    }

    /// Returns the current service list.
    #[must_use]
    pub fn services(&self) -> Arc<Vec<Service>> {
        Arc::clone(&self.services.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns one service by identifier.
    #[must_use]
    pub fn service(&self, id: &ServiceId) -> Option<Service> {
        self.services()
            .iter()
            .find(|service| service.id() == id)
            .cloned()
    }

    /// Returns the prober used for every endpoint.
    #[must_use]
    pub const fn prober(&self) -> &Arc<P> {
        &self.prober
    }

    /// Returns the shared history store.
    #[must_use]
    pub const fn history(&self) -> &Arc<HistoryStore<C>> {
        &self.history
    }

    /// Returns the scheduler settings.
    #[must_use]
    pub const fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    fn state(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current diagnostic counters.
    #[must_use]
    pub fn diagnostics(&self) -> CycleDiagnostics {
        let now = self.clock.utc();
        let state = self.state();
        CycleDiagnostics {
            consecutive_skips: state.consecutive_skips,
            total_skips: state.total_skips,
            cycle_in_flight: self.cycle_active.load(Ordering::SeqCst),
            in_flight_elapsed_ms: state
                .in_flight_since
                .and_then(|since| u64::try_from((now - since).num_milliseconds()).ok()),
            last_cycle_at: state.last_cycle_at,
            next_cycle_at: state.next_cycle_at,
            cycles_completed: state.cycles_completed,
        }
    }

    fn record_skip(&self) -> u64 {
        let mut state = self.state();
        state.consecutive_skips += 1;
        state.total_skips += 1;
        let elapsed_ms = state
            .in_flight_since
            .map(|since| (self.clock.utc() - since).num_milliseconds());
        tracing::warn!(
            consecutive_skips = state.consecutive_skips,
            total_skips = state.total_skips,
            in_flight_elapsed_ms = ?elapsed_ms,
            "probe cycle still running; skipping tick"
        );
        state.consecutive_skips
    }

    fn finish_cycle(&self, finished_at: DateTime<Utc>) {
        let mut state = self.state();
        state.last_cycle_at = Some(finished_at);
        state.next_cycle_at = chrono::Duration::from_std(self.settings.interval)
            .ok()
            .map(|interval| finished_at + interval);
        state.consecutive_skips = 0;
        state.in_flight_since = None;
        state.cycles_completed += 1;
    }

    async fn execute_cycle(&self, started_at: DateTime<Utc>) -> CycleReport {
        let services = self.services();
        let queue: Mutex<VecDeque<&Service>> = Mutex::new(services.iter().collect());
        let tally = CycleTally::default();
        let workers = self.settings.concurrency.min(services.len()).max(1);

        tracing::info!(services = services.len(), workers, "probe cycle started");
        join_all((0..workers).map(|_| self.work_queue(&queue, &tally))).await;

        CycleReport {
            started_at,
            finished_at: self.clock.utc(),
            services: services.len(),
            probed: tally.probed.load(Ordering::SeqCst),
            short_circuited: tally.short_circuited.load(Ordering::SeqCst),
            failed_services: tally.failed_services.load(Ordering::SeqCst),
        }
    }

    async fn work_queue(&self, queue: &Mutex<VecDeque<&Service>>, tally: &CycleTally) {
        loop {
            let claimed = queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(service) = claimed else {
                return;
            };

            let outcome = AssertUnwindSafe(self.probe_service(service, tally))
                .catch_unwind()
                .await;
            if outcome.is_err() {
                tally.failed_services.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(service = %service.id(), "service probe task panicked");
            }
        }
    }

    async fn probe_service(&self, service: &Service, tally: &CycleTally) {
        if let [endpoint] = service.endpoints() {
            let result = self.prober.probe(endpoint).await;
            tally.probed.fetch_add(1, Ordering::SeqCst);
            self.history.append(&service.key_for(endpoint), result);
            return;
        }

        let mut ordered = service.endpoints().to_vec();
        self.ordering.order(&mut ordered);

        let mut down_url: Option<String> = None;
        for endpoint in &ordered {
            let key = service.key_for(endpoint);
            if let Some(url) = &down_url {
                let skipped = CheckResult::short_circuited(
                    self.clock.utc(),
                    AuthStatus::from_hint(endpoint.auth_expected()),
                    format!("short-circuited after {url} was down"),
                );
                tally.short_circuited.fetch_add(1, Ordering::SeqCst);
                self.history.append(&key, skipped);
                continue;
            }

            let result = self.prober.probe(endpoint).await;
            tally.probed.fetch_add(1, Ordering::SeqCst);
            if result.health().is_down() {
                down_url = Some(endpoint.url().to_owned());
            }
            self.history.append(&key, result);
        }
    }

    /// Probes every endpoint of one service in parallel, without
    /// short-circuiting, and records every result.
    ///
    /// Returns the probed service, or `None` when `id` is unknown.
    pub async fn full_probe(&self, id: &ServiceId) -> Option<Service> {
        let service = self.service(id)?;
        let results = join_all(
            service
                .endpoints()
                .iter()
                .map(|endpoint| self.prober.probe(endpoint)),
        )
        .await;
        for (endpoint, result) in service.endpoints().iter().zip(results) {
            self.history.append(&service.key_for(endpoint), result);
        }
        tracing::info!(service = %service.id(), endpoints = service.endpoints().len(), "full probe finished");
        Some(service)
    }
}

/// Holds the single-cycle gate for the lifetime of a running cycle.
///
/// Dropping it (on completion, panic, or abort) reopens the gate.
struct ActiveCycle<P, C>
where
    P: EndpointProber,
    C: Clock + Send + Sync,
{
    scheduler: Arc<Scheduler<P, C>>,
}

impl<P, C> Drop for ActiveCycle<P, C>
where
    P: EndpointProber,
    C: Clock + Send + Sync,
{
    fn drop(&mut self) {
        self.scheduler.state().in_flight_since = None;
        self.scheduler.cycle_active.store(false, Ordering::SeqCst);
    }
}

impl<P, C> Scheduler<P, C>
where
    P: EndpointProber + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Starts a cycle unless one is already running.
    ///
    /// A refused start increments both skip counters by one; nothing is
    /// queued.
    pub fn trigger(self: &Arc<Self>) -> CycleTrigger {
        if self
            .cycle_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return CycleTrigger::Skipped {
                consecutive_skips: self.record_skip(),
            };
        }

        let started_at = self.clock.utc();
        self.state().in_flight_since = Some(started_at);
        let active = ActiveCycle {
            scheduler: Arc::clone(self),
        };
        CycleTrigger::Started(tokio::spawn(async move {
            let report = active.scheduler.execute_cycle(started_at).await;
            active.scheduler.finish_cycle(report.finished_at);
            tracing::info!(
                services = report.services,
                probed = report.probed,
                short_circuited = report.short_circuited,
                failed_services = report.failed_services,
                "probe cycle finished"
            );
            drop(active);
            report
        }))
    }

    /// Runs one cycle to completion, or returns `None` when a cycle is
    /// already in flight or the cycle task was cancelled.
    pub async fn run_cycle(self: &Arc<Self>) -> Option<CycleReport> {
        match self.trigger() {
            CycleTrigger::Started(handle) => handle.await.ok(),
            CycleTrigger::Skipped { .. } => None,
        }
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The next regular cycle starts one interval after the previous one
    /// finished.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval = self.settings.interval;
        while !*shutdown.borrow() {
            if let CycleTrigger::Started(cycle) = self.trigger() {
                if !self.supervise(cycle, &mut shutdown).await {
                    return;
                }
            }

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("shutdown requested; scheduler stopping");
    }

    /// Waits for a running cycle while an overrun watchdog ticks every
    /// interval; each tick that lands during the cycle is a skipped start.
    ///
    /// Returns `false` when shutdown was requested and the cycle cancelled.
    async fn supervise(
        self: &Arc<Self>,
        mut cycle: JoinHandle<CycleReport>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let interval = self.settings.interval;
        let mut watchdog =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                biased;
                joined = &mut cycle => {
                    if let Err(err) = joined {
                        tracing::warn!(error = %err, "probe cycle task failed");
                    }
                    return true;
                }
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested; cancelling probe cycle");
                    cycle.abort();
                    return false;
                }
                _ = watchdog.tick() => {
                    if let CycleTrigger::Started(next) = self.trigger() {
                        cycle = next;
                    }
                }
            }
        }
    }
}
