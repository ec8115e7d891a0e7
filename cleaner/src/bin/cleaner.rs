use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use common::clock::{Clock, SystemClock};
use common::config::Config;
use common::telemetry::{BookkeeperSink, NullSink, ProcessEvent, ProcessEventKind, Severity, Sink};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(
    name = "cleaner",
    version,
    about = "Sweeps success/ and discard/ of directories older than the retention window, off-peak only"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(
        long,
        value_name = "PATH",
        default_value = "/etc/series-router/cleaner.toml"
    )]
    config: PathBuf,

    /// Run a single sweep pass and exit instead of looping
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn build_sink(cfg: &Config) -> Arc<dyn Sink> {
    match cfg.bookkeeper.as_deref().and_then(|addr| addr.parse().ok()) {
        Some(addr) => Arc::new(BookkeeperSink::connect(addr)),
        None => Arc::new(NullSink),
    }
}

async fn run_once(cfg: &Config, sink: &dyn Sink, clock: &dyn Clock) {
    match cleaner::run_once(cfg, sink, clock).await {
        Ok(stats) if stats.ran => tracing::info!(?stats, "cleaner pass complete"),
        Ok(_) => tracing::debug!("outside offpeak window, skipping sweep"),
        Err(e) => tracing::error!(error = %e, "cleaner pass failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let sink: Arc<dyn Sink> = build_sink(&cfg);
    let clock = SystemClock;

    sink.send_process_event(ProcessEvent::new(
        ProcessEventKind::Boot,
        Severity::Info,
        "cleaner starting",
    ))
    .await;

    if args.once {
        run_once(&cfg, sink.as_ref(), &clock).await;
        return Ok(());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut ticker = interval(Duration::from_secs(cfg.cleaner_scan_interval));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(&cfg, sink.as_ref(), &clock).await;
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    sink.send_process_event(ProcessEvent::new(
        ProcessEventKind::Shutdown,
        Severity::Info,
        "cleaner stopped",
    ))
    .await;
    Ok(())
}
