//! Zero-length marker files that encode per-directory lifecycle state.
//!
//! Presence, not content, is the signal. `.sending` must be claimed with an
//! exclusive create (`O_CREAT|O_EXCL`) so that at most one dispatcher worker
//! ever holds it for a given directory - anything weaker (check-then-create)
//! re-introduces the race this protocol exists to avoid.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// A writer (router, or upstream) is still populating this directory.
    Lock,
    /// A dispatcher worker has claimed this directory for sending.
    Sending,
    /// A prior attempt failed in a way that requires operator attention.
    Error,
    /// `dcmsend` completed and wrote its status report here.
    SentReport,
}

impl Marker {
    pub fn filename(self) -> &'static str {
        match self {
            Marker::Lock => ".lock",
            Marker::Sending => ".sending",
            Marker::Error => ".error",
            Marker::SentReport => "sent.txt",
        }
    }
}

pub fn path(dir: &std::path::Path, marker: Marker) -> std::path::PathBuf {
    dir.join(marker.filename())
}

pub fn exists(dir: &std::path::Path, marker: Marker) -> bool {
    path(dir, marker).exists()
}

/// Creates `marker` in `dir`, failing with `ErrorKind::AlreadyExists` if it is
/// already held. This is the claim primitive: callers must treat that error
/// kind as "someone else owns this directory", not as a failure to propagate.
pub async fn create_exclusive(dir: &std::path::Path, marker: Marker) -> std::io::Result<()> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path(dir, marker))
        .await
        .map(|_| ())
}

/// Removes `marker` from `dir`. Tolerates the marker already being absent.
pub async fn remove(dir: &std::path::Path, marker: Marker) -> std::io::Result<()> {
    match tokio::fs::remove_file(path(dir, marker)).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
