//! `scan_and_dispatch()` - one pass over `outgoing/`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::clock::{epoch_seconds, Clock};
use common::config::Config;
use common::target::TargetDescriptor;
use common::telemetry::Sink;

use crate::execute::{execute, ExecuteOutcome};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub scanned: usize,
    pub delivered: usize,
    pub deferred: usize,
    pub suspended: usize,
    pub skipped: usize,
}

/// The readiness predicate from spec.md §4.2: actionable (§3 invariant)
/// and, if `next_retry_at` is present, due.
pub async fn is_ready_for_sending(dir: &Path, clock: &dyn Clock) -> Option<TargetDescriptor> {
    let target = common::directory::actionable_target(dir).await?;
    if let Some(next_retry_at) = target.next_retry_at {
        if epoch_seconds(clock.now()) < next_retry_at {
            return None;
        }
    }
    Some(target)
}

/// Scans `cfg.outgoing_folder` once and dispatches every ready directory.
/// `max_concurrent` bounds how many directories are delivered in parallel
/// within this pass (spec.md §5: sequential by default, with an opt-in
/// worker pool for intra-service parallelism).
pub async fn scan_and_dispatch(
    cfg: &Config,
    telemetry: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    max_concurrent: usize,
) -> anyhow::Result<DispatchStats> {
    let outgoing = Path::new(&cfg.outgoing_folder);
    let success_dir = PathBuf::from(&cfg.success_folder);
    let error_dir = PathBuf::from(&cfg.error_folder);

    let mut ready = Vec::new();
    let mut entries = tokio::fs::read_dir(outgoing).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let dir = entry.path();
        if let Some(target) = is_ready_for_sending(&dir, clock.as_ref()).await {
            ready.push((dir, target));
        }
    }

    let mut stats = DispatchStats {
        scanned: ready.len(),
        ..Default::default()
    };

    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1)));
    let mut joins = tokio::task::JoinSet::new();
    for (dir, target) in ready {
        let permit = semaphore.clone().acquire_owned().await?;
        let success_dir = success_dir.clone();
        let error_dir = error_dir.clone();
        let telemetry = telemetry.clone();
        let clock = clock.clone();
        let retry_max = cfg.retry_max;
        let retry_delay = cfg.retry_delay;
        joins.spawn(async move {
            let _permit = permit;
            execute(
                &target,
                &dir,
                &success_dir,
                &error_dir,
                retry_max,
                retry_delay,
                telemetry.as_ref(),
                clock.as_ref(),
            )
            .await
        });
    }

    while let Some(result) = joins.join_next().await {
        match result {
            Ok(Ok(outcome)) => match outcome {
                ExecuteOutcome::Delivered => stats.delivered += 1,
                ExecuteOutcome::Deferred => stats.deferred += 1,
                ExecuteOutcome::Suspended => stats.suspended += 1,
                ExecuteOutcome::Skipped => stats.skipped += 1,
            },
            Ok(Err(e)) => tracing::error!(error = %e, "dispatch worker failed"),
            Err(e) => tracing::error!(error = %e, "dispatch worker panicked"),
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::clock::FixedClock;
    use common::markers::{self, Marker};

    #[tokio::test]
    async fn not_ready_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        markers::create_exclusive(dir.path(), Marker::Lock)
            .await
            .unwrap();
        let clock = FixedClock(std::time::SystemTime::now());
        assert!(is_ready_for_sending(dir.path(), &clock).await.is_none());
    }

    #[tokio::test]
    async fn future_retry_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        common::testutils::write_dcm(dir.path(), "1.2.3", "a").await;
        let t = TargetDescriptor {
            target_ip: "10.0.0.1".to_string(),
            target_port: 104,
            target_aet_target: "SITEX".to_string(),
            target_aet_source: None,
            target_name: None,
            series_uid: None,
            retries: 1,
            next_retry_at: Some(epoch_seconds(std::time::SystemTime::now()) + 3600.0),
        };
        t.write(dir.path()).await.unwrap();
        let clock = FixedClock(std::time::SystemTime::now());
        assert!(is_ready_for_sending(dir.path(), &clock).await.is_none());
    }

    #[tokio::test]
    async fn past_retry_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        common::testutils::write_dcm(dir.path(), "1.2.3", "a").await;
        let t = TargetDescriptor {
            target_ip: "10.0.0.1".to_string(),
            target_port: 104,
            target_aet_target: "SITEX".to_string(),
            target_aet_source: None,
            target_name: None,
            series_uid: None,
            retries: 1,
            next_retry_at: Some(epoch_seconds(std::time::SystemTime::now()) - 60.0),
        };
        t.write(dir.path()).await.unwrap();
        let clock = FixedClock(std::time::SystemTime::now());
        assert!(is_ready_for_sending(dir.path(), &clock).await.is_some());
    }

    #[tokio::test]
    async fn empty_outgoing_is_a_no_op() {
        let outgoing_tmp = tempfile::tempdir().unwrap();
        let outgoing_path = outgoing_tmp.path();
        let success_path = outgoing_path.join("success");
        let error_path = outgoing_path.join("error");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(
            file,
            r#"
incoming_folder = "unused"
outgoing_folder = {outgoing_path:?}
success_folder = {success_path:?}
discard_folder = "unused"
error_folder = {error_path:?}
series_complete_trigger = 30
router_scan_interval = 10
cleaner_scan_interval = 3600
retention = 604800
offpeak_start = "22:00"
offpeak_end = "06:00"
"#
        )
        .unwrap();
        let cfg = Config::load(file.path()).unwrap();
        let telemetry: Arc<dyn Sink> = Arc::new(common::telemetry::NullSink);
        let clock: Arc<dyn Clock> = Arc::new(common::clock::SystemClock);
        let stats = scan_and_dispatch(&cfg, telemetry, clock, 1).await.unwrap();
        assert_eq!(stats, DispatchStats::default());
    }
}
