//! Periodic persistence of the history store.

use crate::monitor::ports::HistoryPersistence;
use crate::monitor::services::{HistoryStore, LoadSummary};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Restores history at start-up and flushes it on an interval.
///
/// Storage failures are logged and never stop monitoring; the engine simply
/// keeps running on in-memory history until a later flush succeeds.
pub struct HistoryFlusher<C>
where
    C: Clock + Send + Sync,
{
    history: Arc<HistoryStore<C>>,
    persistence: Arc<dyn HistoryPersistence>,
    interval: Duration,
}

impl<C> HistoryFlusher<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a flusher writing every `interval`.
    #[must_use]
    pub fn new(
        history: Arc<HistoryStore<C>>,
        persistence: Arc<dyn HistoryPersistence>,
        interval: Duration,
    ) -> Self {
        Self {
            history,
            persistence,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Loads the persisted dump into the store.
    ///
    /// Returns `None` when nothing was stored or the read failed.
    pub async fn restore(&self) -> Option<LoadSummary> {
        match self.persistence.read().await {
            Ok(Some(dump)) => {
                let summary = self.history.load(dump);
                tracing::info!(
                    restored = summary.restored,
                    expired = summary.expired,
                    ignored = summary.ignored,
                    "history restored"
                );
                Some(summary)
            }
            Ok(None) => {
                tracing::info!("no persisted history found");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted history; starting empty");
                None
            }
        }
    }

    /// Writes the current history.
    pub async fn flush(&self) {
        let dump = self.history.dump();
        match self.persistence.write(&dump).await {
            Ok(()) => tracing::debug!(series = dump.len(), "history flushed"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist history; keeping it in memory");
            }
        }
    }

    /// Flushes every interval until `shutdown` fires, then flushes once more.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => self.flush().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.flush().await;
    }
}
