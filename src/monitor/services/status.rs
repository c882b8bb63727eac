//! Query facade used by the serving layer.

use crate::monitor::domain::ServiceId;
use crate::monitor::ports::EndpointProber;
use crate::monitor::services::{
    Aggregator, CycleDiagnostics, Scheduler, ServiceDetail, StatusSnapshot,
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by [`StatusService`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatusServiceError {
    /// No monitored service has the requested identifier.
    #[error("service not found: {0}")]
    NotFound(ServiceId),
}

/// Result type for status queries.
pub type StatusServiceResult<T> = Result<T, StatusServiceError>;

/// Read-only status queries plus the on-demand full probe.
pub struct StatusService<P, C>
where
    P: EndpointProber,
    C: Clock + Send + Sync,
{
    scheduler: Arc<Scheduler<P, C>>,
    aggregator: Aggregator<C>,
}

impl<P, C> StatusService<P, C>
where
    P: EndpointProber,
    C: Clock + Send + Sync,
{
    /// Creates the facade over a scheduler and its history store.
    #[must_use]
    pub fn new(scheduler: Arc<Scheduler<P, C>>, clock: Arc<C>) -> Self {
        let aggregator = Aggregator::new(Arc::clone(scheduler.history()), clock);
        Self {
            scheduler,
            aggregator,
        }
    }

    /// Returns the rollup of every monitored service.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let diagnostics = self.scheduler.diagnostics();
        self.aggregator.snapshot(
            &self.scheduler.services(),
            diagnostics.last_cycle_at,
            diagnostics.next_cycle_at,
        )
    }

    /// Returns the rollup and endpoint detail of one service.
    ///
    /// # Errors
    ///
    /// Returns [`StatusServiceError::NotFound`] for an unknown identifier.
    pub fn service_detail(&self, id: &ServiceId) -> StatusServiceResult<ServiceDetail> {
        let service = self
            .scheduler
            .service(id)
            .ok_or_else(|| StatusServiceError::NotFound(id.clone()))?;
        Ok(self.aggregator.service_detail(&service))
    }

    /// Probes every endpoint of one service now and returns the updated
    /// detail.
    ///
    /// # Errors
    ///
    /// Returns [`StatusServiceError::NotFound`] for an unknown identifier.
    pub async fn full_probe(&self, id: &ServiceId) -> StatusServiceResult<ServiceDetail> {
        let service = self
            .scheduler
            .full_probe(id)
            .await
            .ok_or_else(|| StatusServiceError::NotFound(id.clone()))?;
        Ok(self.aggregator.service_detail(&service))
    }

    /// Returns scheduler diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> CycleDiagnostics {
        self.scheduler.diagnostics()
    }
}
