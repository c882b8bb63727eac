//! Three-stage MCP prober: handshake, liveness ping, tool listing.

use crate::monitor::domain::{AuthStatus, CheckResult, Endpoint, HealthStatus};
use crate::monitor::ports::{EndpointProber, McpConnector, McpSession, McpSessionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Highest ping latency, in milliseconds, still classified as healthy.
pub const HEALTHY_LATENCY_MS: u64 = 500;

/// Time bounds applied to one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    probe: Duration,
    close: Duration,
}

impl ProbeTimeouts {
    /// Creates timeouts for the staged probe and the session close.
    #[must_use]
    pub const fn new(probe: Duration, close: Duration) -> Self {
        Self { probe, close }
    }

    /// Returns the hard bound on handshake, ping, and listing combined.
    #[must_use]
    pub const fn probe(&self) -> Duration {
        self.probe
    }

    /// Returns the bound on session cleanup.
    #[must_use]
    pub const fn close(&self) -> Duration {
        self.close
    }
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(2))
    }
}

/// Probe stage reached by an attempt; decides how a timeout is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ProbeStage {
    #[default]
    Handshake,
    Ping,
    Listing,
}

/// How far a staged probe got before it stopped.
#[derive(Debug)]
enum ProbeOutcome {
    HandshakeFailed(McpSessionError),
    PingFailed(McpSessionError),
    ListingFailed {
        latency_ms: u64,
        error: McpSessionError,
    },
    Completed {
        latency_ms: u64,
        tool_count: usize,
    },
}

/// State of one probe attempt.
///
/// The attempt lives outside the future raced against the probe timeout, so
/// whichever side wins, the open session and the progress made so far are
/// still available afterwards. The session is held from the moment the
/// transport opens, so a handshake that fails or stalls is still closed.
#[derive(Default)]
struct ProbeAttempt {
    stage: ProbeStage,
    session: Option<Box<dyn McpSession>>,
    latency_ms: Option<u64>,
}

impl ProbeAttempt {
    async fn run<T>(&mut self, connector: &T, endpoint: &Endpoint) -> ProbeOutcome
    where
        T: McpConnector + ?Sized,
    {
        let session = match connector.connect(endpoint).await {
            Ok(opened) => self.session.insert(opened),
            Err(error) => return ProbeOutcome::HandshakeFailed(error),
        };
        if let Err(error) = session.initialize().await {
            return ProbeOutcome::HandshakeFailed(error);
        }

        self.stage = ProbeStage::Ping;
        let ping_started = Instant::now();
        if let Err(error) = session.ping().await {
            return ProbeOutcome::PingFailed(error);
        }
        let latency_ms = elapsed_ms(ping_started);
        self.latency_ms = Some(latency_ms);

        self.stage = ProbeStage::Listing;
        match session.list_tools().await {
            Ok(tools) => ProbeOutcome::Completed {
                latency_ms,
                tool_count: tools.len(),
            },
            Err(error) => ProbeOutcome::ListingFailed { latency_ms, error },
        }
    }

    fn timed_out(&self, timestamp: DateTime<Utc>, endpoint: &Endpoint, limit: Duration) -> CheckResult {
        let message = format!("probe timed out after {}ms", limit.as_millis());
        match self.stage {
            ProbeStage::Handshake => CheckResult::new(
                timestamp,
                HealthStatus::Down,
                AuthStatus::from_hint(endpoint.auth_expected()),
            )
            .with_error(message),
            ProbeStage::Ping => {
                CheckResult::new(timestamp, HealthStatus::Degraded, AuthStatus::Open)
                    .with_error(message)
            }
            ProbeStage::Listing => {
                let mut result =
                    CheckResult::new(timestamp, HealthStatus::Unhealthy, AuthStatus::Open)
                        .with_error(message);
                if let Some(latency_ms) = self.latency_ms {
                    result = result.with_latency_ms(latency_ms);
                }
                result
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Maps a latency to its health band.
///
/// Any latency above [`HEALTHY_LATENCY_MS`] is degraded; there is no
/// down-by-latency outcome.
#[must_use]
pub const fn health_for_latency(latency_ms: u64) -> HealthStatus {
    if latency_ms <= HEALTHY_LATENCY_MS {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

fn classify_handshake_failure(
    timestamp: DateTime<Utc>,
    endpoint: &Endpoint,
    error: &McpSessionError,
) -> CheckResult {
    let hinted = AuthStatus::from_hint(endpoint.auth_expected());
    match error {
        McpSessionError::Unauthorized(_) => {
            CheckResult::new(timestamp, HealthStatus::Healthy, AuthStatus::Protected)
        }
        McpSessionError::Connect(_) | McpSessionError::ServerFault(_) => {
            CheckResult::new(timestamp, HealthStatus::Down, hinted).with_error(error.to_string())
        }
        McpSessionError::UnexpectedStatus(_) => {
            CheckResult::new(timestamp, HealthStatus::Unhealthy, hinted)
                .with_error(error.to_string())
        }
        McpSessionError::Protocol(_) | McpSessionError::Rpc { .. } => {
            let auth = if endpoint.auth_expected() {
                AuthStatus::Protected
            } else {
                AuthStatus::Open
            };
            CheckResult::new(timestamp, HealthStatus::Unhealthy, auth).with_error(error.to_string())
        }
    }
}

fn classify(timestamp: DateTime<Utc>, endpoint: &Endpoint, outcome: ProbeOutcome) -> CheckResult {
    match outcome {
        ProbeOutcome::HandshakeFailed(error) => {
            classify_handshake_failure(timestamp, endpoint, &error)
        }
        ProbeOutcome::PingFailed(error) => {
            CheckResult::new(timestamp, HealthStatus::Degraded, AuthStatus::Open)
                .with_error(format!("ping failed: {error}"))
        }
        ProbeOutcome::ListingFailed { latency_ms, error } => {
            CheckResult::new(timestamp, HealthStatus::Unhealthy, AuthStatus::Open)
                .with_latency_ms(latency_ms)
                .with_error(format!("tools/list failed: {error}"))
        }
        ProbeOutcome::Completed {
            latency_ms,
            tool_count,
        } => CheckResult::new(timestamp, health_for_latency(latency_ms), AuthStatus::Open)
            .with_latency_ms(latency_ms)
            .with_tool_count(tool_count),
    }
}

/// Prober that speaks MCP through an [`McpConnector`].
#[derive(Debug)]
pub struct McpProber<T, C>
where
    T: McpConnector,
    C: Clock + Send + Sync,
{
    connector: Arc<T>,
    clock: Arc<C>,
    timeouts: ProbeTimeouts,
}

impl<T, C> McpProber<T, C>
where
    T: McpConnector,
    C: Clock + Send + Sync,
{
    /// Creates a prober.
    #[must_use]
    pub const fn new(connector: Arc<T>, clock: Arc<C>, timeouts: ProbeTimeouts) -> Self {
        Self {
            connector,
            clock,
            timeouts,
        }
    }

    /// Returns the configured time bounds.
    #[must_use]
    pub const fn timeouts(&self) -> ProbeTimeouts {
        self.timeouts
    }

    async fn release(&self, endpoint: &Endpoint, session: Option<Box<dyn McpSession>>) {
        let Some(open_session) = session else {
            return;
        };
        match tokio::time::timeout(self.timeouts.close(), open_session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::debug!(url = endpoint.url(), error = %error, "session close failed");
            }
            Err(_) => {
                tracing::debug!(
                    url = endpoint.url(),
                    close_timeout = ?self.timeouts.close(),
                    "session close timed out"
                );
            }
        }
    }
}

#[async_trait]
impl<T, C> EndpointProber for McpProber<T, C>
where
    T: McpConnector,
    C: Clock + Send + Sync,
{
    async fn probe(&self, endpoint: &Endpoint) -> CheckResult {
        let timestamp = self.clock.utc();
        let mut attempt = ProbeAttempt::default();
        let raced = tokio::time::timeout(
            self.timeouts.probe(),
            attempt.run(self.connector.as_ref(), endpoint),
        )
        .await;
        let result = match raced {
            Ok(outcome) => classify(timestamp, endpoint, outcome),
            Err(_) => attempt.timed_out(timestamp, endpoint, self.timeouts.probe()),
        };
        self.release(endpoint, attempt.session.take()).await;

        tracing::debug!(
            url = endpoint.url(),
            health = %result.health(),
            auth = %result.auth(),
            latency_ms = ?result.latency_ms(),
            tool_count = ?result.tool_count(),
            "probe finished"
        );
        result
    }
}
