//! Retention sweep over a single top-level directory (`success/` or
//! `discard/`), grounded on the original's `clean()`/`delete_folder()`.

use std::path::Path;
use std::time::{Duration, SystemTime};

use common::clock::Clock;
use common::series::find_series_uid;
use common::telemetry::{Severity, SeriesEvent, SeriesEventKind, Sink};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

struct Candidate {
    path: std::path::PathBuf,
    mtime: SystemTime,
}

async fn collect_candidates(dir: &Path, retention: Duration, clock: &dyn Clock) -> std::io::Result<Vec<Candidate>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let now = clock.now();
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_dir() {
            continue;
        }
        let mtime = metadata.modified()?;
        let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        if age > retention {
            candidates.push(Candidate {
                path: entry.path(),
                mtime,
            });
        }
    }
    // Oldest first: this resolves the original's self-contradicting
    // `sorted(..., reverse=True)` against its own "delete the oldest
    // directories first" docstring in favor of the documented intent.
    candidates.sort_by_key(|c| c.mtime);
    Ok(candidates)
}

/// Removes every immediate subdirectory of `dir` older than `retention`,
/// oldest first. A single removal failure is logged and reported, and the
/// sweep continues with the next candidate rather than aborting.
pub async fn clean_dir(
    dir: &Path,
    retention: Duration,
    telemetry: &dyn Sink,
    clock: &dyn Clock,
) -> std::io::Result<CleanStats> {
    let candidates = collect_candidates(dir, retention, clock).await?;
    let mut stats = CleanStats {
        scanned: candidates.len(),
        ..Default::default()
    };

    for candidate in candidates {
        let uid = find_series_uid(&candidate.path).await;
        match tokio::fs::remove_dir_all(&candidate.path).await {
            Ok(()) => {
                stats.removed += 1;
                telemetry
                    .send_series_event(SeriesEvent::new(
                        SeriesEventKind::Clean,
                        Severity::Info,
                        &uid,
                        format!("removed {}", candidate.path.display()),
                    ))
                    .await;
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(path = %candidate.path.display(), error = %e, "failed to remove directory");
                telemetry
                    .send_series_event(SeriesEvent::new(
                        SeriesEventKind::Error,
                        Severity::Error,
                        &uid,
                        format!("failed to remove {}: {e}", candidate.path.display()),
                    ))
                    .await;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::clock::FixedClock;
    use common::telemetry::NullSink;

    #[tokio::test]
    async fn removes_only_directories_older_than_retention() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("1.2.3");
        let fresh = root.path().join("4.5.6");
        tokio::fs::create_dir(&old).await.unwrap();
        tokio::fs::create_dir(&fresh).await.unwrap();
        common::testutils::set_mtime(&old, common::testutils::seconds_ago(10_000));

        let clock = FixedClock(SystemTime::now());
        let stats = clean_dir(root.path(), Duration::from_secs(3600), &NullSink, &clock)
            .await
            .unwrap();

        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn oldest_directories_are_removed_first() {
        let root = tempfile::tempdir().unwrap();
        let oldest = root.path().join("a");
        let older = root.path().join("b");
        tokio::fs::create_dir(&oldest).await.unwrap();
        tokio::fs::create_dir(&older).await.unwrap();
        common::testutils::set_mtime(&oldest, common::testutils::seconds_ago(20_000));
        common::testutils::set_mtime(&older, common::testutils::seconds_ago(15_000));

        let candidates = collect_candidates(root.path(), Duration::from_secs(3600), &FixedClock(SystemTime::now()))
            .await
            .unwrap();

        assert_eq!(candidates[0].path, oldest);
        assert_eq!(candidates[1].path, older);
    }

    #[tokio::test]
    async fn empty_directory_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let clock = FixedClock(SystemTime::now());
        let stats = clean_dir(root.path(), Duration::from_secs(3600), &NullSink, &clock)
            .await
            .unwrap();
        assert_eq!(stats, CleanStats::default());
    }
}
