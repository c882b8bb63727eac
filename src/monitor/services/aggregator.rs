//! Read-side rollups of history into the externally visible status view.
//!
//! Nothing here mutates the history store; every view is recomputed from the
//! current series on each call.

use crate::monitor::domain::{
    AuthStatus, CheckResult, Endpoint, HealthIcon, HealthStatus, HistorySeries, Service,
    ServiceId, TransportKind, summarize_icons, worst,
};
use crate::monitor::services::HistoryStore;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;

/// Number of hourly points in every downsampled history.
pub const HOURLY_POINTS: usize = 24;

/// Current and historical status of one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    /// Endpoint URL.
    pub url: String,
    /// Disambiguation label.
    pub label: String,
    /// Transport variant.
    pub transport: TransportKind,
    /// Health of the latest observation, `unknown` when there is none.
    pub health: HealthStatus,
    /// Auth status of the latest observation, `unknown` when there is none.
    pub auth: AuthStatus,
    /// Latency of the latest observation.
    pub latency_ms: Option<u64>,
    /// Tool count of the latest observation.
    pub tool_count: Option<usize>,
    /// Diagnostic text of the latest observation.
    pub error: Option<String>,
    /// Whether the latest observation was short-circuited.
    pub short_circuited: bool,
    /// Time of the latest observation.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Share of retained observations that were not `down`, in percent.
    pub uptime: Option<f64>,
    /// Worst status per hour, oldest first.
    pub history: Vec<HealthStatus>,
}

/// Rollup of one service across its endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Service identifier.
    pub id: ServiceId,
    /// Display name.
    pub display_name: String,
    /// Catalog version.
    pub version: String,
    /// Worst latest health across endpoints.
    pub health: HealthStatus,
    /// Health-icon summary, worst first.
    pub icons: Vec<HealthIcon>,
    /// Highest latest latency among endpoints reporting one.
    pub latency_ms: Option<u64>,
    /// Mean of the endpoints' uptimes, ignoring endpoints without data.
    pub uptime: Option<f64>,
    /// Worst status per hour across endpoints, oldest first.
    pub history: Vec<HealthStatus>,
    /// Number of endpoints.
    pub endpoint_count: usize,
}

/// Service rollup together with every endpoint's detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    /// Service rollup.
    #[serde(flatten)]
    pub status: ServiceStatus,
    /// Per-endpoint detail, in catalog order.
    pub endpoints: Vec<EndpointStatus>,
}

/// Full status view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Completion time of the last probe cycle.
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Time the next regular cycle is due.
    pub next_cycle_at: Option<DateTime<Utc>>,
    /// Rollup of every service, in catalog order.
    pub services: Vec<ServiceStatus>,
}

#[expect(clippy::float_arithmetic, reason = "percentages are reported with two decimals")]
fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of entries that are not `down`, rounded to two decimals.
///
/// Returns `None` for an empty series.
#[must_use]
pub fn uptime_percent(series: &HistorySeries) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let total = series.len();
    let up = series.iter().filter(|entry| !entry.health().is_down()).count();
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "entry counts are far below 2^52"
    )]
    let percent = 100.0 * up as f64 / total as f64;
    Some(round_two_decimals(percent))
}

/// Mean of the present values, rounded to two decimals.
#[must_use]
pub fn mean_uptime(uptimes: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = uptimes.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "endpoint counts are tiny"
    )]
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    Some(round_two_decimals(mean))
}

/// Downsamples entries into [`HOURLY_POINTS`] hourly buckets ending at `now`.
///
/// Point `i` holds the worst status among entries between `23 - i` and
/// `24 - i` hours old, or `unknown` when the bucket is empty. Entries stamped
/// after `now` count towards the newest bucket; entries 24 hours old or
/// older are ignored.
#[must_use]
pub fn hourly_history<'a, I>(entries: I, now: DateTime<Utc>) -> Vec<HealthStatus>
where
    I: IntoIterator<Item = &'a CheckResult>,
{
    let mut buckets = vec![HealthStatus::Unknown; HOURLY_POINTS];
    for entry in entries {
        let hours_ago = usize::try_from((now - entry.timestamp()).num_hours().max(0))
            .unwrap_or(usize::MAX);
        let Some(index) = (HOURLY_POINTS - 1).checked_sub(hours_ago) else {
            continue;
        };
        if let Some(bucket) = buckets.get_mut(index) {
            *bucket = worst([*bucket, entry.health()]);
        }
    }
    buckets
}

/// Combines several hourly histories point by point with worst-of.
#[must_use]
pub fn combine_hourly(histories: &[Vec<HealthStatus>]) -> Vec<HealthStatus> {
    let mut combined = vec![HealthStatus::Unknown; HOURLY_POINTS];
    for history in histories {
        for (slot, status) in combined.iter_mut().zip(history) {
            *slot = worst([*slot, *status]);
        }
    }
    combined
}

/// Builds status views from the history store.
#[derive(Debug)]
pub struct Aggregator<C>
where
    C: Clock + Send + Sync,
{
    history: Arc<HistoryStore<C>>,
    clock: Arc<C>,
}

impl<C> Aggregator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an aggregator over `history`.
    #[must_use]
    pub const fn new(history: Arc<HistoryStore<C>>, clock: Arc<C>) -> Self {
        Self { history, clock }
    }

    fn endpoint_view(&self, service: &Service, endpoint: &Endpoint, now: DateTime<Utc>) -> EndpointStatus {
        let series = self
            .history
            .series(&service.key_for(endpoint))
            .unwrap_or_default();
        let latest = series.latest();
        EndpointStatus {
            url: endpoint.url().to_owned(),
            label: endpoint.label().to_owned(),
            transport: endpoint.transport(),
            health: latest.map_or(HealthStatus::Unknown, CheckResult::health),
            auth: latest.map_or(AuthStatus::Unknown, CheckResult::auth),
            latency_ms: latest.and_then(CheckResult::latency_ms),
            tool_count: latest.and_then(CheckResult::tool_count),
            error: latest.and_then(CheckResult::error).map(str::to_owned),
            short_circuited: latest.is_some_and(CheckResult::is_short_circuited),
            last_checked_at: latest.map(CheckResult::timestamp),
            uptime: uptime_percent(&series),
            history: hourly_history(series.iter(), now),
        }
    }

    fn rollup(service: &Service, endpoints: &[EndpointStatus]) -> ServiceStatus {
        let healths: Vec<HealthStatus> = endpoints.iter().map(|endpoint| endpoint.health).collect();
        let uptimes: Vec<Option<f64>> = endpoints.iter().map(|endpoint| endpoint.uptime).collect();
        let histories: Vec<Vec<HealthStatus>> = endpoints
            .iter()
            .map(|endpoint| endpoint.history.clone())
            .collect();
        ServiceStatus {
            id: service.id().clone(),
            display_name: service.display_name().to_owned(),
            version: service.version().to_owned(),
            health: worst(healths.iter().copied()),
            icons: summarize_icons(&healths),
            latency_ms: endpoints.iter().filter_map(|endpoint| endpoint.latency_ms).max(),
            uptime: mean_uptime(&uptimes),
            history: combine_hourly(&histories),
            endpoint_count: endpoints.len(),
        }
    }

    /// Returns the rollup and per-endpoint detail of one service.
    #[must_use]
    pub fn service_detail(&self, service: &Service) -> ServiceDetail {
        let now = self.clock.utc();
        let endpoints: Vec<EndpointStatus> = service
            .endpoints()
            .iter()
            .map(|endpoint| self.endpoint_view(service, endpoint, now))
            .collect();
        ServiceDetail {
            status: Self::rollup(service, &endpoints),
            endpoints,
        }
    }

    /// Returns the rollup of one service.
    #[must_use]
    pub fn service_status(&self, service: &Service) -> ServiceStatus {
        self.service_detail(service).status
    }

    /// Returns the full snapshot over `services`.
    #[must_use]
    pub fn snapshot(
        &self,
        services: &[Service],
        last_cycle_at: Option<DateTime<Utc>>,
        next_cycle_at: Option<DateTime<Utc>>,
    ) -> StatusSnapshot {
        StatusSnapshot {
            last_cycle_at,
            next_cycle_at,
            services: services
                .iter()
                .map(|service| self.service_status(service))
                .collect(),
        }
    }
}
