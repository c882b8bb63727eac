//! Keyed, retention-bounded store of endpoint history series.

use crate::monitor::domain::{CheckResult, EndpointKey, HistorySeries};
use crate::monitor::ports::HistoryDump;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default retention window.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Counts reported by [`HistoryStore::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries merged into known series.
    pub restored: usize,
    /// Entries dropped because they were older than the retention window.
    pub expired: usize,
    /// Entries dropped because their key is unknown or malformed.
    pub ignored: usize,
}

/// History store shared by the scheduler (writer) and the aggregator
/// (reader).
///
/// Every series only ever holds entries younger than the retention window
/// once an append or load has returned. Writes to keys that were never
/// initialized are ignored.
#[derive(Debug)]
pub struct HistoryStore<C>
where
    C: Clock + Send + Sync,
{
    series: RwLock<HashMap<EndpointKey, HistorySeries>>,
    retention: Duration,
    clock: Arc<C>,
}

impl<C> HistoryStore<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty store with the default 24 hour retention window.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self::with_retention(clock, Duration::hours(DEFAULT_RETENTION_HOURS))
    }

    /// Creates an empty store with a custom retention window.
    #[must_use]
    pub fn with_retention(clock: Arc<C>, retention: Duration) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            retention,
            clock,
        }
    }

    /// Returns the retention window.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        self.retention
    }

    fn cutoff(&self) -> DateTime<Utc> {
        self.clock.utc() - self.retention
    }

    // Series are append-only, so data behind a poisoned lock is still valid.
    fn read_guard(&self) -> RwLockReadGuard<'_, HashMap<EndpointKey, HistorySeries>> {
        self.series.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, HashMap<EndpointKey, HistorySeries>> {
        self.series.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ensures an (initially empty) series exists for `key`.
    ///
    /// Existing series are left untouched.
    pub fn initialize(&self, key: EndpointKey) {
        self.write_guard().entry(key).or_default();
    }

    /// Appends `result` to the series for `key` and evicts expired entries.
    ///
    /// Results for keys that were never initialized are dropped.
    pub fn append(&self, key: &EndpointKey, result: CheckResult) {
        let cutoff = self.cutoff();
        let mut guard = self.write_guard();
        let Some(series) = guard.get_mut(key) else {
            tracing::debug!(key = %key, "ignoring result for unknown endpoint");
            return;
        };
        series.push(result);
        let evicted = series.trim_before(cutoff);
        if evicted > 0 {
            tracing::trace!(key = %key, evicted, "evicted expired history entries");
        }
    }

    /// Merges a persisted dump into the known series.
    ///
    /// Entries older than the retention window, malformed keys, and keys of
    /// endpoints not initialized in this store are discarded.
    #[must_use]
    pub fn load(&self, dump: HistoryDump) -> LoadSummary {
        let cutoff = self.cutoff();
        let mut summary = LoadSummary::default();
        let mut guard = self.write_guard();

        for (raw_key, entries) in dump {
            let found = match EndpointKey::parse(&raw_key) {
                Ok(key) => guard.get_mut(&key),
                Err(_) => None,
            };
            let Some(target) = found else {
                tracing::debug!(key = raw_key.as_str(), "ignoring persisted history for unknown key");
                summary.ignored += entries.len();
                continue;
            };

            for entry in entries {
                if entry.timestamp() < cutoff {
                    summary.expired += 1;
                } else {
                    target.push(entry);
                    summary.restored += 1;
                }
            }
            target.trim_before(cutoff);
        }
        summary
    }

    /// Serializes every series, including empty ones.
    #[must_use]
    pub fn dump(&self) -> HistoryDump {
        self.read_guard()
            .iter()
            .map(|(key, series)| (key.to_string(), series.to_vec()))
            .collect()
    }

    /// Returns a copy of the series for `key`.
    #[must_use]
    pub fn series(&self, key: &EndpointKey) -> Option<HistorySeries> {
        self.read_guard().get(key).cloned()
    }

    /// Returns the most recent result for `key`.
    #[must_use]
    pub fn latest(&self, key: &EndpointKey) -> Option<CheckResult> {
        self.read_guard()
            .get(key)
            .and_then(HistorySeries::latest)
            .cloned()
    }

    /// Returns whether `key` has been initialized.
    #[must_use]
    pub fn contains(&self, key: &EndpointKey) -> bool {
        self.read_guard().contains_key(key)
    }

    /// Returns the number of initialized series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    /// Returns whether no series has been initialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }
}
