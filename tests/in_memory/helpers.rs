//! Shared harness for end-to-end engine tests.

use mockable::DefaultClock;
use std::sync::Arc;
use std::time::Duration;
use vigil::monitor::adapters::ScriptedMcpConnector;
use vigil::monitor::domain::Service;
use vigil::monitor::ports::EndpointOrdering;
use vigil::monitor::services::{
    HistoryStore, McpProber, ProbeTimeouts, Scheduler, SchedulerSettings, StatusService,
    parse_catalog,
};

pub type TestProber = McpProber<ScriptedMcpConnector, DefaultClock>;

/// Engine wired to a scripted connector.
pub struct Engine {
    pub connector: ScriptedMcpConnector,
    pub scheduler: Arc<Scheduler<TestProber, DefaultClock>>,
    pub status: StatusService<TestProber, DefaultClock>,
}

impl Engine {
    pub fn new(
        services: Vec<Service>,
        ordering: Arc<dyn EndpointOrdering>,
        concurrency: usize,
    ) -> Self {
        let clock = Arc::new(DefaultClock);
        let connector = ScriptedMcpConnector::new();
        let prober = McpProber::new(
            Arc::new(connector.clone()),
            Arc::clone(&clock),
            ProbeTimeouts::new(Duration::from_secs(15), Duration::from_secs(2)),
        );
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(prober),
            Arc::new(HistoryStore::new(Arc::clone(&clock))),
            ordering,
            Arc::clone(&clock),
            SchedulerSettings::new(Duration::from_secs(300), concurrency),
        ));
        scheduler.replace_services(services);
        let status = StatusService::new(Arc::clone(&scheduler), clock);
        Self {
            connector,
            scheduler,
            status,
        }
    }
}

pub const CATALOG: &str = r#"[
  {
    "identifier": "search",
    "displayName": "Search",
    "version": "2.0.0",
    "endpoints": [
      {"url": "https://eu.search.example/mcp", "transportKind": "streamable_http"},
      {"url": "https://us.search.example/mcp", "transportKind": "streamable_http"},
      {"url": "https://ap.search.example/mcp", "transportKind": "streamable_http"}
    ]
  },
  {
    "identifier": "vault",
    "displayName": "Vault",
    "version": "1.4.2",
    "url": "https://vault.example/sse",
    "transport": "sse",
    "requiresAuth": true
  },
  {
    "identifier": "weather",
    "url": "https://weather.example/mcp"
  }
]"#;

pub fn catalog_services() -> eyre::Result<Vec<Service>> {
    Ok(parse_catalog(CATALOG)?)
}
