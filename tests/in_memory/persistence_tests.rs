//! History persistence across engine restarts.

use super::helpers::{Engine, catalog_services};
use camino::Utf8PathBuf;
use chrono::{Duration as ChronoDuration, Utc};
use eyre::{Result, eyre};
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vigil::monitor::adapters::{EndpointScript, JsonFileHistoryPersistence};
use vigil::monitor::domain::{AuthStatus, CheckResult, HealthStatus, ServiceId};
use vigil::monitor::ports::{CatalogOrdering, HistoryDump, HistoryPersistence};
use vigil::monitor::services::HistoryFlusher;

const HISTORY_FILE: &str = "history.json";

struct DataDir {
    _temp: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn data_dir() -> DataDir {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(temp.path().join("vigil")).expect("UTF-8 temp path");
    DataDir { _temp: temp, path }
}

fn scripted_engine() -> Result<Engine> {
    let engine = Engine::new(catalog_services()?, Arc::new(CatalogOrdering), 4);
    for url in [
        "https://eu.search.example/mcp",
        "https://us.search.example/mcp",
        "https://ap.search.example/mcp",
        "https://vault.example/sse",
        "https://weather.example/mcp",
    ] {
        engine.connector.script(url, EndpointScript::healthy(2));
    }
    Ok(engine)
}

fn flusher_for(engine: &Engine, data_dir: &DataDir) -> Result<HistoryFlusher<mockable::DefaultClock>> {
    let persistence = JsonFileHistoryPersistence::open(&data_dir.path, HISTORY_FILE)?;
    Ok(HistoryFlusher::new(
        Arc::clone(engine.scheduler.history()),
        Arc::new(persistence),
        Duration::from_secs(60),
    ))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn restarted_engine_restores_flushed_history(data_dir: DataDir) -> Result<()> {
    let first = scripted_engine()?;
    first
        .scheduler
        .run_cycle()
        .await
        .ok_or_else(|| eyre!("cycle did not run"))?;
    flusher_for(&first, &data_dir)?.flush().await;

    let second = scripted_engine()?;
    let summary = flusher_for(&second, &data_dir)?
        .restore()
        .await
        .ok_or_else(|| eyre!("history should be restored"))?;

    assert_eq!(summary.restored, 5);
    assert_eq!(summary.expired, 0);
    let search = second.status.service_detail(&ServiceId::new("search")?)?;
    assert_eq!(search.status.health, HealthStatus::Healthy);
    assert_eq!(search.status.uptime, Some(100.0));
    assert_eq!(second.connector.connect_count(), 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_entries_are_dropped_on_restore(data_dir: DataDir) -> Result<()> {
    let persistence = JsonFileHistoryPersistence::open(&data_dir.path, HISTORY_FILE)?;
    let now = Utc::now();
    let mut dump = HistoryDump::new();
    dump.insert(
        "weather|https://weather.example/mcp".to_owned(),
        vec![
            CheckResult::new(now - ChronoDuration::hours(48), HealthStatus::Down, AuthStatus::Unknown),
            CheckResult::new(now - ChronoDuration::minutes(5), HealthStatus::Healthy, AuthStatus::Open),
        ],
    );
    persistence.write(&dump).await?;

    let engine = scripted_engine()?;
    let summary = flusher_for(&engine, &data_dir)?
        .restore()
        .await
        .ok_or_else(|| eyre!("history should be restored"))?;

    assert_eq!(summary.restored, 1);
    assert_eq!(summary.expired, 1);
    let weather = engine.status.service_detail(&ServiceId::new("weather")?)?;
    assert_eq!(weather.status.uptime, Some(100.0));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn corrupt_history_file_does_not_stop_monitoring(data_dir: DataDir) -> Result<()> {
    std::fs::create_dir_all(&data_dir.path)?;
    std::fs::write(data_dir.path.join(HISTORY_FILE), "{ not json")?;
    let engine = scripted_engine()?;
    let flusher = flusher_for(&engine, &data_dir)?;

    assert!(flusher.restore().await.is_none());
    engine
        .scheduler
        .run_cycle()
        .await
        .ok_or_else(|| eyre!("cycle did not run"))?;
    flusher.flush().await;

    let reread = JsonFileHistoryPersistence::open(&data_dir.path, HISTORY_FILE)?
        .read()
        .await?
        .ok_or_else(|| eyre!("flush should replace the corrupt file"))?;
    assert_eq!(reread.len(), 5);
    Ok(())
}
