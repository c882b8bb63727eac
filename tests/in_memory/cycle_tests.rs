//! Full probe cycles from catalog to status snapshot.

use super::helpers::{Engine, catalog_services};
use eyre::{Result, eyre};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use vigil::monitor::adapters::EndpointScript;
use vigil::monitor::domain::{AuthStatus, HealthIcon, HealthStatus, ServiceId};
use vigil::monitor::ports::{CatalogOrdering, McpSessionError, RandomOrdering};

const EU: &str = "https://eu.search.example/mcp";
const US: &str = "https://us.search.example/mcp";
const AP: &str = "https://ap.search.example/mcp";
const VAULT: &str = "https://vault.example/sse";
const WEATHER: &str = "https://weather.example/mcp";

#[rstest]
#[tokio::test(start_paused = true)]
async fn cycle_produces_a_snapshot_for_every_service() -> Result<()> {
    let engine = Engine::new(catalog_services()?, Arc::new(CatalogOrdering), 4);
    for url in [EU, US, AP] {
        engine.connector.script(
            url,
            EndpointScript::healthy(6).with_ping_delay(Duration::from_millis(40)),
        );
    }
    engine.connector.script(
        VAULT,
        EndpointScript::failing_handshake(McpSessionError::from_status(401)),
    );
    engine.connector.script(
        WEATHER,
        EndpointScript::healthy(1).with_ping_delay(Duration::from_millis(1_200)),
    );

    let report = engine
        .scheduler
        .run_cycle()
        .await
        .ok_or_else(|| eyre!("cycle did not run"))?;
    let snapshot = engine.status.snapshot();

    assert_eq!(report.probed, 5);
    assert_eq!(snapshot.services.len(), 3);
    assert!(snapshot.last_cycle_at.is_some());
    assert!(snapshot.next_cycle_at > snapshot.last_cycle_at);

    let search = engine.status.service_detail(&ServiceId::new("search")?)?;
    assert_eq!(search.status.health, HealthStatus::Healthy);
    assert_eq!(search.status.icons, vec![HealthIcon::Green; 3]);
    assert_eq!(search.status.latency_ms, Some(40));
    assert_eq!(search.status.uptime, Some(100.0));

    let vault = engine.status.service_detail(&ServiceId::new("vault")?)?;
    assert_eq!(vault.status.health, HealthStatus::Healthy);
    let auth: Vec<AuthStatus> = vault.endpoints.iter().map(|view| view.auth).collect();
    assert_eq!(auth, vec![AuthStatus::Protected]);

    let weather = engine.status.service_detail(&ServiceId::new("weather")?)?;
    assert_eq!(weather.status.health, HealthStatus::Degraded);
    assert_eq!(weather.status.icons, vec![HealthIcon::Yellow]);

    assert_eq!(engine.connector.opened_count(), engine.connector.closed_count());
    Ok(())
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(42)]
#[case(1_234)]
#[tokio::test(start_paused = true)]
async fn shuffled_order_short_circuits_after_the_down_endpoint(#[case] seed: u64) -> Result<()> {
    let engine = Engine::new(
        catalog_services()?,
        Arc::new(RandomOrdering::seeded(seed)),
        1,
    );
    engine.connector.script(EU, EndpointScript::healthy(2));
    engine.connector.script(US, EndpointScript::refused());
    engine.connector.script(AP, EndpointScript::healthy(2));

    engine.scheduler.run_cycle().await;
    let search = engine.status.service_detail(&ServiceId::new("search")?)?;

    let down: Vec<&str> = search
        .endpoints
        .iter()
        .filter(|view| view.health == HealthStatus::Down)
        .map(|view| view.url.as_str())
        .collect();
    assert_eq!(down, vec![US]);
    let skipped = search
        .endpoints
        .iter()
        .filter(|view| view.short_circuited)
        .count();
    let probed_healthy = search
        .endpoints
        .iter()
        .filter(|view| view.health == HealthStatus::Healthy)
        .count();
    assert_eq!(skipped + probed_healthy, 2);
    assert!(
        search
            .endpoints
            .iter()
            .filter(|view| view.short_circuited)
            .all(|view| view.health == HealthStatus::Unknown)
    );
    assert_eq!(search.status.health, HealthStatus::Down);
    assert_eq!(search.status.icons.first(), Some(&HealthIcon::Red));
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn on_demand_probe_covers_short_circuited_endpoints() -> Result<()> {
    let engine = Engine::new(catalog_services()?, Arc::new(CatalogOrdering), 2);
    engine.connector.script(EU, EndpointScript::refused());
    engine.connector.script(US, EndpointScript::healthy(3));
    engine.connector.script(AP, EndpointScript::healthy(3));
    let search_id = ServiceId::new("search")?;

    engine.scheduler.run_cycle().await;
    let cycled = engine.status.service_detail(&search_id)?;
    assert_eq!(
        cycled
            .endpoints
            .iter()
            .filter(|view| view.short_circuited)
            .count(),
        2
    );

    let probed = engine.status.full_probe(&search_id).await?;

    assert!(probed.endpoints.iter().all(|view| !view.short_circuited));
    let healthy = probed
        .endpoints
        .iter()
        .filter(|view| view.health == HealthStatus::Healthy)
        .count();
    assert_eq!(healthy, 2);
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn hung_endpoint_times_out_without_stalling_the_cycle() -> Result<()> {
    let engine = Engine::new(catalog_services()?, Arc::new(CatalogOrdering), 3);
    for url in [EU, US, AP, VAULT] {
        engine.connector.script(url, EndpointScript::healthy(1));
    }
    engine.connector.script(
        WEATHER,
        EndpointScript::healthy(1).with_handshake_delay(Duration::from_secs(3_600)),
    );
    let started = tokio::time::Instant::now();

    engine.scheduler.run_cycle().await;

    assert!(started.elapsed() < Duration::from_secs(16));
    let weather = engine.status.service_detail(&ServiceId::new("weather")?)?;
    assert_eq!(weather.status.health, HealthStatus::Down);
    let error = weather
        .endpoints
        .first()
        .and_then(|view| view.error.clone())
        .ok_or_else(|| eyre!("timeout should be described"))?;
    assert!(error.contains("timed out"));
    Ok(())
}
