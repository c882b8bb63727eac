//! Health-icon summary of a service's endpoint distribution.

use super::HealthStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum number of icons shown for a service.
pub const MAX_ICONS: usize = 3;

/// Severity color of a health icon.
///
/// Variant order is the display priority, worst first:
/// `red < orange < yellow < gray < green`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthIcon {
    /// At least one endpoint is down.
    Red,
    /// At least one endpoint is unhealthy.
    Orange,
    /// At least one endpoint is degraded.
    Yellow,
    /// At least one endpoint has no usable observation.
    Gray,
    /// At least one endpoint is healthy.
    Green,
}

impl From<HealthStatus> for HealthIcon {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Down => Self::Red,
            HealthStatus::Unhealthy => Self::Orange,
            HealthStatus::Degraded => Self::Yellow,
            HealthStatus::Unknown => Self::Gray,
            HealthStatus::Healthy => Self::Green,
        }
    }
}

/// Summarises endpoint statuses into at most [`MAX_ICONS`] icons.
///
/// One icon is emitted per distinct color, worst first. When there are fewer
/// distinct colors than `min(MAX_ICONS, statuses.len())`, the worst color is
/// repeated to fill the remaining slots. An empty input yields no icons.
#[must_use]
pub fn summarize_icons(statuses: &[HealthStatus]) -> Vec<HealthIcon> {
    let distinct: BTreeSet<HealthIcon> = statuses.iter().copied().map(HealthIcon::from).collect();
    let Some(&worst_icon) = distinct.first() else {
        return Vec::new();
    };

    let slots = statuses.len().min(MAX_ICONS);
    let mut icons: Vec<HealthIcon> = distinct.into_iter().take(slots).collect();
    while icons.len() < slots {
        icons.push(worst_icon);
    }
    icons.sort_unstable();
    icons
}
