//! `execute()` - the per-directory delivery state machine (spec.md §4.2).

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::SystemTime;

use common::clock::{epoch_seconds, Clock};
use common::markers::{self, Marker};
use common::series::SeriesUid;
use common::target::TargetDescriptor;
use common::telemetry::{ProcessEvent, ProcessEventKind, SeriesEvent, SeriesEventKind, Severity, Sink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// `.sending` was already held by another worker; nothing was done.
    Skipped,
    Delivered,
    /// Sender failed but `retries < retry_max`; eligible again at `next_retry_at`.
    Deferred,
    /// Sender failed and `retries >= retry_max`; moved to `error_dir`.
    Suspended,
}

/// Runs the full state machine for one outgoing directory: claim, send,
/// then move-on-success or retry/suspend-on-failure.
pub async fn execute(
    target: &TargetDescriptor,
    dir: &Path,
    success_dir: &Path,
    error_dir: &Path,
    retry_max: u32,
    retry_delay: f64,
    telemetry: &dyn Sink,
    clock: &dyn Clock,
) -> anyhow::Result<ExecuteOutcome> {
    match markers::create_exclusive(dir, Marker::Sending).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Ok(ExecuteOutcome::Skipped);
        }
        Err(e) => return Err(e.into()),
    }

    let uid = common::series::find_series_uid(dir).await;
    let dcm_count = common::directory::dcm_file_count(dir).await.unwrap_or(0);

    match run_sender(target, dir).await {
        Ok(status) if status.success() => {
            handle_success(dir, success_dir, dcm_count, &uid, telemetry, clock).await
        }
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            handle_failure(
                target, dir, error_dir, retry_max, retry_delay, &uid, code, telemetry, clock,
            )
            .await
        }
        Err(e) => {
            tracing::error!(series_uid = %uid, error = %e, "failed to spawn dcmsend");
            handle_failure(
                target, dir, error_dir, retry_max, retry_delay, &uid, -1, telemetry, clock,
            )
            .await
        }
    }
}

async fn run_sender(target: &TargetDescriptor, dir: &Path) -> std::io::Result<ExitStatus> {
    let source_aet = target.target_aet_source.clone().unwrap_or_default();
    let report_path = dir.join("sent.txt");
    tokio::process::Command::new("dcmsend")
        .arg(&target.target_ip)
        .arg(target.target_port.to_string())
        .arg("+sd")
        .arg(dir)
        .arg("-aet")
        .arg(&source_aet)
        .arg("-aec")
        .arg(&target.target_aet_target)
        .arg("-nuc")
        .arg("+sp")
        .arg("*.dcm")
        .arg("-to")
        .arg("60")
        .arg("+crf")
        .arg(&report_path)
        .status()
        .await
}

async fn handle_success(
    dir: &Path,
    success_dir: &Path,
    dcm_count: usize,
    uid: &SeriesUid,
    telemetry: &dyn Sink,
    clock: &dyn Clock,
) -> anyhow::Result<ExecuteOutcome> {
    match move_with_collision_handling(dir, success_dir, clock).await {
        Ok(final_dir) => {
            markers::remove(&final_dir, Marker::Sending).await.ok();
            telemetry
                .send_series_event(SeriesEvent::new(
                    SeriesEventKind::Dispatch,
                    Severity::Info,
                    uid,
                    format!("delivered {dcm_count} files"),
                ))
                .await;
            Ok(ExecuteOutcome::Delivered)
        }
        Err(e) => {
            // Directory stays in place, still carrying `.sending`, so
            // `actionable_target` won't pick it up again - this only
            // preserves the data for manual recovery, matching the
            // original's bare `except Exception` swallow in
            // `_move_sent_directory`, not an automatic retry.
            tracing::error!(series_uid = %uid, error = %e, "failed to move delivered directory to success_dir");
            telemetry
                .send_process_event(ProcessEvent::new(
                    ProcessEventKind::Processing,
                    Severity::Error,
                    format!("move to success_dir failed for {}: {e}", dir.display()),
                ))
                .await;
            Ok(ExecuteOutcome::Skipped)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_failure(
    target: &TargetDescriptor,
    dir: &Path,
    error_dir: &Path,
    retry_max: u32,
    retry_delay: f64,
    uid: &SeriesUid,
    exit_code: i32,
    telemetry: &dyn Sink,
    clock: &dyn Clock,
) -> anyhow::Result<ExecuteOutcome> {
    let detail = crate::exit_codes::describe(exit_code);
    let mut updated = target.clone();
    updated.retries += 1;
    updated.next_retry_at = Some(epoch_seconds(clock.now()) + retry_delay);

    if updated.retries < retry_max {
        updated.write(dir).await?;
        markers::remove(dir, Marker::Sending).await?;
        tracing::warn!(series_uid = %uid, exit_code, detail, retries = updated.retries, "delivery failed, will retry");
        return Ok(ExecuteOutcome::Deferred);
    }

    match move_with_collision_handling(dir, error_dir, clock).await {
        Ok(final_dir) => {
            markers::remove(&final_dir, Marker::Sending).await.ok();
            telemetry
                .send_series_event(SeriesEvent::new(
                    SeriesEventKind::Move,
                    Severity::Info,
                    uid,
                    format!("moved to {}", final_dir.display()),
                ))
                .await;
            telemetry
                .send_series_event(SeriesEvent::new(
                    SeriesEventKind::Suspend,
                    Severity::Error,
                    uid,
                    format!("exhausted retries after {detail}"),
                ))
                .await;
            telemetry
                .send_series_event(SeriesEvent::new(
                    SeriesEventKind::Error,
                    Severity::Error,
                    uid,
                    detail.to_string(),
                ))
                .await;
            telemetry
                .send_process_event(ProcessEvent::new(
                    ProcessEventKind::Processing,
                    Severity::Error,
                    format!("series {uid} suspended after {} retries", updated.retries),
                ))
                .await;
            Ok(ExecuteOutcome::Suspended)
        }
        Err(e) => {
            tracing::error!(series_uid = %uid, error = %e, "failed to move exhausted series to error_dir");
            telemetry
                .send_process_event(ProcessEvent::new(
                    ProcessEventKind::Processing,
                    Severity::Error,
                    format!("move to error_dir failed for {}: {e}", dir.display()),
                ))
                .await;
            Ok(ExecuteOutcome::Skipped)
        }
    }
}

/// Moves `dir` under `dest_root`, appending an RFC 3339 timestamp to the
/// basename if it already exists there (`_move_sent_directory` in the
/// original).
async fn move_with_collision_handling(
    dir: &Path,
    dest_root: &Path,
    clock: &dyn Clock,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dest_root).await?;
    let name = dir.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "directory has no name")
    })?;
    let mut dest = dest_root.join(name);
    if dest.exists() {
        let timestamp = rfc3339(clock.now());
        dest = dest_root.join(format!("{}_{timestamp}", name.to_string_lossy()));
    }
    tokio::fs::rename(dir, &dest).await?;
    Ok(dest)
}

fn rfc3339(time: SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339()
}
