//! Endpoint prober port consumed by the scheduler.

use crate::monitor::domain::{CheckResult, Endpoint};
use async_trait::async_trait;

/// Produces one observation for one endpoint.
///
/// Implementations never fail: every failure mode resolves to a
/// [`CheckResult`] describing it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EndpointProber: Send + Sync {
    /// Probes the endpoint within the implementation's time bound.
    async fn probe(&self, endpoint: &Endpoint) -> CheckResult;
}
