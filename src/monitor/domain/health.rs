//! Health and authentication status domain types.

use super::{ParseAuthStatusError, ParseHealthStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of an MCP endpoint or service.
///
/// Variant order is the worst-of ordering used by every rollup:
/// `down < unhealthy < degraded < healthy < unknown`. The minimum of a set of
/// statuses is therefore its worst member, and `unknown` only wins when
/// nothing more informative is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The endpoint could not be reached or answered with a server fault.
    Down,
    /// The endpoint answered but violated the protocol.
    Unhealthy,
    /// The endpoint is reachable but slow or failed its liveness ping.
    Degraded,
    /// The endpoint completed every probe stage within the latency budget.
    Healthy,
    /// No observation is available.
    Unknown,
}

impl HealthStatus {
    /// Every status, worst first.
    pub const ALL: [Self; 5] = [
        Self::Down,
        Self::Unhealthy,
        Self::Degraded,
        Self::Healthy,
        Self::Unknown,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Unhealthy => "unhealthy",
            Self::Degraded => "degraded",
            Self::Healthy => "healthy",
            Self::Unknown => "unknown",
        }
    }

    /// Returns whether this status counts against uptime.
    #[must_use]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Down)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HealthStatus {
    type Error = ParseHealthStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "down" => Ok(Self::Down),
            "unhealthy" => Ok(Self::Unhealthy),
            "degraded" => Ok(Self::Degraded),
            "healthy" => Ok(Self::Healthy),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseHealthStatusError(value.to_owned())),
        }
    }
}

/// Reduces statuses to the worst one.
///
/// The reduction is order independent and returns
/// [`HealthStatus::Unknown`] for an empty input.
#[must_use]
pub fn worst<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses.into_iter().min().unwrap_or(HealthStatus::Unknown)
}

/// Authentication exposure of an MCP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// An unauthenticated handshake succeeded.
    Open,
    /// The endpoint enforces authorization.
    Protected,
    /// No authoritative signal was observed.
    Unknown,
}

impl AuthStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Protected => "protected",
            Self::Unknown => "unknown",
        }
    }

    /// Derives an auth status from the catalog's static hint.
    #[must_use]
    pub const fn from_hint(auth_expected: bool) -> Self {
        if auth_expected {
            Self::Protected
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AuthStatus {
    type Error = ParseAuthStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "protected" => Ok(Self::Protected),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseAuthStatusError(value.to_owned())),
        }
    }
}
