use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use common::clock::SystemClock;
use common::config::Config;
use common::rules::GlobRuleEvaluator;
use common::telemetry::{
    BookkeeperSink, Metrics, NullSink, ProcessEvent, ProcessEventKind, Severity, Sink,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(
    name = "router",
    version,
    about = "Scans incoming/ for quiescent series and splits them into per-target outgoing/ staging directories"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, value_name = "PATH", default_value = "/etc/series-router/router.toml")]
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

fn build_metrics(cfg: &Config) -> Option<Metrics> {
    let ip = cfg.graphite_ip.as_deref()?;
    let port = cfg.graphite_port?;
    format!("{ip}:{port}").parse().ok().map(Metrics::connect)
}

async fn run_once(
    cfg: &Config,
    evaluator: &GlobRuleEvaluator,
    sink: &dyn Sink,
    metrics: Option<&Metrics>,
    cancel: &CancellationToken,
) {
    match router::scan_and_route(cfg, evaluator, sink, metrics, &SystemClock, cancel).await {
        Ok(stats) => tracing::info!(?stats, "scan complete"),
        Err(e) => tracing::error!(error = %e, "scan failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    // The full rule language is out of scope; operators wire up a
    // `GlobRuleEvaluator` by configuring `[[rules]]`. Empty until that
    // loader exists, which matches "no rules configured" today.
    let evaluator = GlobRuleEvaluator::default();
    let sink = build_sink(&cfg);
    let metrics = build_metrics(&cfg);
    let cancel = CancellationToken::new();

    sink.send_process_event(ProcessEvent::new(
        ProcessEventKind::Boot,
        Severity::Info,
        "router starting",
    ))
    .await;

    if args.once {
        run_once(&cfg, &evaluator, sink.as_ref(), metrics.as_ref(), &cancel).await;
        return Ok(());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut ticker = interval(Duration::from_secs(cfg.router_scan_interval));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(&cfg, &evaluator, sink.as_ref(), metrics.as_ref(), &cancel).await;
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                cancel.cancel();
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                cancel.cancel();
                break;
            }
        }
    }

    sink.send_process_event(ProcessEvent::new(
        ProcessEventKind::Shutdown,
        Severity::Info,
        "router stopped",
    ))
    .await;
    Ok(())
}
