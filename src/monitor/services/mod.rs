//! Application services of the monitoring engine.

pub mod aggregator;
pub mod catalog;
pub mod history;
pub mod persistence;
pub mod prober;
pub mod scheduler;
pub mod status;

pub use aggregator::{
    Aggregator, EndpointStatus, HOURLY_POINTS, ServiceDetail, ServiceStatus, StatusSnapshot,
    combine_hourly, hourly_history, mean_uptime, uptime_percent,
};
pub use catalog::{CatalogError, load_catalog, parse_catalog};
pub use history::{DEFAULT_RETENTION_HOURS, HistoryStore, LoadSummary};
pub use persistence::HistoryFlusher;
pub use prober::{HEALTHY_LATENCY_MS, McpProber, ProbeTimeouts, health_for_latency};
pub use scheduler::{CycleDiagnostics, CycleReport, CycleTrigger, Scheduler, SchedulerSettings};
pub use status::{StatusService, StatusServiceError, StatusServiceResult};
