//! In-memory history persistence with switchable failures.

use crate::monitor::ports::{
    HistoryDump, HistoryPersistence, HistoryPersistenceError, HistoryPersistenceResult,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// History persistence that keeps the last written dump in memory.
///
/// Reads and writes can be switched to fail, which lets callers exercise the
/// in-memory-only degradation path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryPersistence {
    state: Arc<InMemoryPersistenceState>,
}

#[derive(Debug, Default)]
struct InMemoryPersistenceState {
    stored: RwLock<Option<HistoryDump>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryHistoryPersistence {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `dump`.
    #[must_use]
    pub fn with_dump(dump: HistoryDump) -> Self {
        let persistence = Self::default();
        *persistence
            .state
            .stored
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(dump);
        persistence
    }

    /// Makes subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the last successfully written dump.
    #[must_use]
    pub fn stored(&self) -> Option<HistoryDump> {
        self.state
            .stored
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many writes succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }
}

fn simulated_failure(operation: &str) -> HistoryPersistenceError {
    HistoryPersistenceError::storage(std::io::Error::other(format!(
        "simulated {operation} failure"
    )))
}

#[async_trait]
impl HistoryPersistence for InMemoryHistoryPersistence {
    async fn read(&self) -> HistoryPersistenceResult<Option<HistoryDump>> {
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(simulated_failure("read"));
        }
        Ok(self.stored())
    }

    async fn write(&self, dump: &HistoryDump) -> HistoryPersistenceResult<()> {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(simulated_failure("write"));
        }
        *self
            .state
            .stored
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(dump.clone());
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
