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
    name = "dispatcher",
    version,
    about = "Scans outgoing/ for ready series directories and delivers them via dcmsend"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(
        long,
        value_name = "PATH",
        default_value = "/etc/series-router/dispatcher.toml"
    )]
    config: PathBuf,

    /// Run a single scan pass and exit instead of looping
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

async fn run_once(cfg: &Config, sink: Arc<dyn Sink>, clock: Arc<dyn Clock>) {
    match dispatcher::scan_and_dispatch(cfg, sink, clock, cfg.max_concurrent_dispatches).await {
        Ok(stats) => tracing::info!(?stats, "dispatch pass complete"),
        Err(e) => tracing::error!(error = %e, "dispatch pass failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let sink: Arc<dyn Sink> = build_sink(&cfg);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    sink.send_process_event(ProcessEvent::new(
        ProcessEventKind::Boot,
        Severity::Info,
        "dispatcher starting",
    ))
    .await;

    if args.once {
        run_once(&cfg, sink.clone(), clock.clone()).await;
        return Ok(());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut ticker = interval(Duration::from_secs(cfg.dispatcher_scan_interval));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(&cfg, sink.clone(), clock.clone()).await;
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
        "dispatcher stopped",
    ))
    .await;
    Ok(())
}
