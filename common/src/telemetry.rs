//! Telemetry emission.
//!
//! The bookkeeper/graphite wire formats are out of scope as *internals*
//! (spec.md §1), but every pipeline stage still needs somewhere to send
//! events so failures never pass silently. Each [`Sink`] impl owns a
//! background drain task fed by an `UnboundedSender`, grounded on
//! `remote::tracelog::run_sender`'s receiver-drain loop, so a slow or
//! unreachable collector never stalls the router/dispatcher/cleaner hot path.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::series::SeriesUid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessEventKind {
    Boot,
    ShutdownRequest,
    Shutdown,
    ConfigUpdate,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesEventKind {
    Dispatch,
    Clean,
    Error,
    Suspend,
    Move,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessEvent {
    pub kind: ProcessEventKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesEvent {
    pub kind: SeriesEventKind,
    pub severity: Severity,
    pub series_uid: String,
    pub message: String,
}

#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn send_process_event(&self, event: ProcessEvent);
    async fn send_series_event(&self, event: SeriesEvent);
}

impl ProcessEvent {
    pub fn new(kind: ProcessEventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

impl SeriesEvent {
    pub fn new(
        kind: SeriesEventKind,
        severity: Severity,
        uid: &SeriesUid,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            series_uid: uid.as_str().to_string(),
            message: message.into(),
        }
    }
}

/// Discards everything. Used by default in tests, and as a safe baseline if
/// no `bookkeeper` address is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait::async_trait]
impl Sink for NullSink {
    async fn send_process_event(&self, _event: ProcessEvent) {}
    async fn send_series_event(&self, _event: SeriesEvent) {}
}

enum Message {
    Process(ProcessEvent),
    Series(SeriesEvent),
}

/// Fire-and-forget TCP sink: each event is serialized as one JSON line and
/// written to `addr`. Every failure (connect, write, timeout) is logged at
/// `debug!` and swallowed - telemetry must never block the pipeline it
/// reports on.
#[derive(Debug, Clone)]
pub struct BookkeeperSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl BookkeeperSink {
    pub fn connect(addr: SocketAddr) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_drain(addr, rx));
        Self { tx }
    }
}

#[async_trait::async_trait]
impl Sink for BookkeeperSink {
    async fn send_process_event(&self, event: ProcessEvent) {
        let _ = self.tx.send(Message::Process(event));
    }

    async fn send_series_event(&self, event: SeriesEvent) {
        let _ = self.tx.send(Message::Series(event));
    }
}

async fn run_drain(addr: SocketAddr, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
        let payload = match &msg {
            Message::Process(e) => serde_json::to_vec(e),
            Message::Series(e) => serde_json::to_vec(e),
        };
        let Ok(mut payload) = payload else {
            continue;
        };
        payload.push(b'\n');
        let send = async {
            let mut stream = TcpStream::connect(addr).await?;
            stream.write_all(&payload).await
        };
        match tokio::time::timeout(Duration::from_secs(2), send).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(%addr, error = %e, "bookkeeper send failed"),
            Err(_) => tracing::debug!(%addr, "bookkeeper send timed out"),
        }
    }
}

/// Plaintext Graphite protocol counters, matching `graphyte.init(...)` in
/// the original source. Metric names: `events.run`, `events.boot`,
/// `events.shutdown`, `incoming.files`, `incoming.series`.
#[derive(Debug, Clone)]
pub struct Metrics {
    tx: mpsc::UnboundedSender<(String, u64)>,
}

impl Metrics {
    pub fn connect(addr: SocketAddr) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_metrics_drain(addr, rx));
        Self { tx }
    }

    pub fn increment(&self, metric: &str, value: u64) {
        let _ = self.tx.send((metric.to_string(), value));
    }
}

async fn run_metrics_drain(addr: SocketAddr, mut rx: mpsc::UnboundedReceiver<(String, u64)>) {
    while let Some((metric, value)) = rx.recv().await {
        let line = format!(
            "{metric} {value} {}\n",
            crate::clock::epoch_seconds(std::time::SystemTime::now()) as u64
        );
        let send = async {
            let mut stream = TcpStream::connect(addr).await?;
            stream.write_all(line.as_bytes()).await
        };
        if let Err(e) = tokio::time::timeout(Duration::from_secs(2), send).await {
            tracing::debug!(%addr, error = %e, "graphite send timed out");
        }
    }
}
