//! History persistence port.

use crate::monitor::domain::CheckResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Serialized history: `"<serviceIdentifier>|<endpointUrl>"` mapped to the
/// endpoint's observations, oldest first.
pub type HistoryDump = BTreeMap<String, Vec<CheckResult>>;

/// Result type for history persistence operations.
pub type HistoryPersistenceResult<T> = Result<T, HistoryPersistenceError>;

/// Durable storage for history dumps.
#[async_trait]
pub trait HistoryPersistence: Send + Sync {
    /// Reads the last written dump.
    ///
    /// Returns `None` when nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryPersistenceError`] when storage cannot be read or the
    /// stored dump cannot be decoded.
    async fn read(&self) -> HistoryPersistenceResult<Option<HistoryDump>>;

    /// Replaces the stored dump.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryPersistenceError`] when the dump cannot be encoded or
    /// written.
    async fn write(&self, dump: &HistoryDump) -> HistoryPersistenceResult<()>;
}

/// Errors returned by history persistence adapters.
#[derive(Debug, Clone, Error)]
pub enum HistoryPersistenceError {
    /// Stored data could not be decoded.
    #[error("invalid persisted history: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Storage-layer failure.
    #[error("history storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl HistoryPersistenceError {
    /// Wraps a decoding error.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a storage error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
