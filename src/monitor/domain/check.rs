//! Immutable probe observation.

use super::{AuthStatus, HealthStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation produced by a single probe attempt.
///
/// Values are built once by the prober (or by the scheduler for
/// short-circuited endpoints) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    timestamp: DateTime<Utc>,
    health: HealthStatus,
    auth: AuthStatus,
    #[serde(default)]
    latency_ms: Option<u64>,
    #[serde(default)]
    tool_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    short_circuited: bool,
}

impl CheckResult {
    /// Creates an observation without latency, tool count, or error text.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, health: HealthStatus, auth: AuthStatus) -> Self {
        Self {
            timestamp,
            health,
            auth,
            latency_ms: None,
            tool_count: None,
            error: None,
            short_circuited: false,
        }
    }

    /// Creates the synthetic entry recorded for an endpoint that was skipped
    /// because an earlier endpoint of the same service was down.
    #[must_use]
    pub fn short_circuited(
        timestamp: DateTime<Utc>,
        auth: AuthStatus,
        reason: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(timestamp, HealthStatus::Unknown, auth).with_error(reason);
        result.short_circuited = true;
        result
    }

    /// Sets the measured ping latency.
    #[must_use]
    pub const fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Sets the number of tools the endpoint advertised.
    #[must_use]
    pub const fn with_tool_count(mut self, tool_count: usize) -> Self {
        self.tool_count = Some(tool_count);
        self
    }

    /// Adds a diagnostic message. Blank messages are ignored.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        let normalized = error.into().trim().to_owned();
        if !normalized.is_empty() {
            self.error = Some(normalized);
        }
        self
    }

    /// Returns the time the probe started.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the health classification.
    #[must_use]
    pub const fn health(&self) -> HealthStatus {
        self.health
    }

    /// Returns the auth classification.
    #[must_use]
    pub const fn auth(&self) -> AuthStatus {
        self.auth
    }

    /// Returns the ping latency, if the ping stage completed.
    #[must_use]
    pub const fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    /// Returns the advertised tool count, if listing succeeded.
    #[must_use]
    pub const fn tool_count(&self) -> Option<usize> {
        self.tool_count
    }

    /// Returns the diagnostic message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns whether this entry was synthesised instead of probed.
    #[must_use]
    pub const fn is_short_circuited(&self) -> bool {
        self.short_circuited
    }
}
