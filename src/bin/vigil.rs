//! Vigil daemon: probes the MCP services of a catalog on a fixed interval.
//!
//! Usage:
//!
//! ```text
//! vigil run --catalog services.json [--config vigil.toml] [--interval-secs 60]
//! vigil status --catalog services.json [--config vigil.toml]
//! ```
//!
//! `run` keeps probing until Ctrl-C, flushing history periodically and once
//! more on shutdown. `status` prints the snapshot built from persisted
//! history without probing anything.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use mockable::DefaultClock;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::watch;
use vigil::config::MonitorConfig;
use vigil::monitor::adapters::{HttpMcpConnector, JsonFileHistoryPersistence};
use vigil::monitor::domain::Service;
use vigil::monitor::ports::RandomOrdering;
use vigil::monitor::services::{
    Aggregator, HistoryFlusher, HistoryStore, McpProber, ProbeTimeouts, Scheduler,
    SchedulerSettings, load_catalog,
};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Health monitoring for remote MCP services")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe every catalog service on an interval until interrupted.
    Run(RunArgs),
    /// Print the status snapshot from persisted history.
    Status(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// JSON catalog of services to monitor.
    #[arg(long)]
    catalog: Utf8PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Directory holding the persisted history.
    #[arg(long)]
    data_dir: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Seconds between the end of one cycle and the start of the next.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Per-probe timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum number of services probed at once.
    #[arg(long)]
    concurrency: Option<usize>,
}

impl CommonArgs {
    fn load_config(&self) -> Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir.clone_from(data_dir);
        }
        Ok(config)
    }

    fn load_services(&self) -> Result<Vec<Service>> {
        let services = load_catalog(&self.catalog)?;
        tracing::info!(
            catalog = self.catalog.as_str(),
            services = services.len(),
            "catalog loaded"
        );
        Ok(services)
    }
}

impl RunArgs {
    fn load_config(&self) -> Result<MonitorConfig> {
        let mut config = self.common.load_config()?;
        if let Some(interval_secs) = self.interval_secs {
            config.probe_interval_secs = interval_secs;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.probe_timeout_ms = timeout_ms;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.validate()?;
        Ok(config)
    }
}

fn history_flusher(
    config: &MonitorConfig,
    history: &Arc<HistoryStore<DefaultClock>>,
) -> Result<HistoryFlusher<DefaultClock>> {
    let persistence = JsonFileHistoryPersistence::open(&config.data_dir, &config.history_file)
        .with_context(|| format!("failed to open history directory {}", config.data_dir))?;
    Ok(HistoryFlusher::new(
        Arc::clone(history),
        Arc::new(persistence),
        config.flush_interval(),
    ))
}

async fn run(args: RunArgs) -> Result<()> {
    let config = args.load_config()?;
    let services = args.common.load_services()?;
    let clock = Arc::new(DefaultClock);
    let history = Arc::new(HistoryStore::with_retention(
        Arc::clone(&clock),
        config.retention(),
    ));

    let connector = HttpMcpConnector::new().context("failed to build HTTP client")?;
    let prober = McpProber::new(
        Arc::new(connector),
        Arc::clone(&clock),
        ProbeTimeouts::new(config.probe_timeout(), config.close_timeout()),
    );
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(prober),
        Arc::clone(&history),
        Arc::new(RandomOrdering::from_entropy()),
        clock,
        SchedulerSettings::new(config.probe_interval(), config.concurrency),
    ));
    scheduler.replace_services(services);

    let flusher = Arc::new(history_flusher(&config, &history)?);
    flusher.restore().await;

    tracing::info!(
        interval_secs = config.probe_interval_secs,
        concurrency = config.concurrency,
        data_dir = config.data_dir.as_str(),
        "vigil started"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx.clone()));
    let flusher_task = tokio::spawn({
        let flusher = Arc::clone(&flusher);
        async move { flusher.run(shutdown_rx).await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");
    if shutdown_tx.send(true).is_err() {
        tracing::debug!("background tasks already stopped");
    }

    scheduler_task.await.context("scheduler task failed")?;
    flusher_task.await.context("history flusher task failed")?;
    tracing::info!("vigil stopped");
    Ok(())
}

async fn status(args: CommonArgs) -> Result<()> {
    let config = args.load_config()?;
    config.validate()?;
    let services = args.load_services()?;
    let clock = Arc::new(DefaultClock);
    let history = Arc::new(HistoryStore::with_retention(
        Arc::clone(&clock),
        config.retention(),
    ));
    for service in &services {
        for key in service.endpoint_keys() {
            history.initialize(key);
        }
    }
    history_flusher(&config, &history)?.restore().await;

    let snapshot = Aggregator::new(history, clock).snapshot(&services, None, None);
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &snapshot)?;
    writeln!(stdout)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    vigil::telemetry::init()?;
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Status(args) => status(args).await,
    }
}
