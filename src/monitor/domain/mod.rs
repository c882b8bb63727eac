//! Domain model for MCP service health monitoring.
//!
//! The domain describes monitored services and their endpoints, the
//! immutable observations produced by probing them, the time-ordered series
//! those observations accumulate into, and the pure reductions (worst-of,
//! icon summary) that rollups are built from. Nothing here performs I/O.

mod catalog;
mod check;
mod error;
mod health;
mod history;
mod icon;
mod ids;
mod service;

pub use catalog::{CatalogRecord, CurrentRecord, EndpointRecord, LegacyRecord};
pub use check::CheckResult;
pub use error::{MonitorDomainError, ParseAuthStatusError, ParseHealthStatusError};
pub use health::{AuthStatus, HealthStatus, worst};
pub use history::HistorySeries;
pub use icon::{HealthIcon, MAX_ICONS, summarize_icons};
pub use ids::{EndpointKey, ServiceId};
pub use service::{Endpoint, Service, TransportKind};
