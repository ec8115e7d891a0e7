//! `scan_and_route()` - the router's one operation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use common::clock::Clock;
use common::config::Config;
use common::markers::{self, Marker};
use common::rules::{self, RuleEvaluator, SeriesTags};
use common::series::SeriesUid;
use common::telemetry::{Metrics, ProcessEvent, ProcessEventKind, Severity, Sink};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub series_scanned: usize,
    pub series_routed: usize,
    pub targets_created: usize,
}

struct Observation {
    max_mtime: BTreeMap<SeriesUid, SystemTime>,
    saw_error_file: bool,
}

async fn observe_incoming(incoming: &Path) -> std::io::Result<Observation> {
    let mut max_mtime = BTreeMap::new();
    let mut saw_error_file = false;
    let mut entries = tokio::fs::read_dir(incoming).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.ends_with(".error") {
            saw_error_file = true;
            continue;
        }
        if !name.ends_with(".tags") {
            continue;
        }
        let Some(uid) = common::series::series_uid_of(name) else {
            continue;
        };
        let mtime = entry.metadata().await?.modified()?;
        max_mtime
            .entry(uid)
            .and_modify(|existing| {
                if mtime > *existing {
                    *existing = mtime;
                }
            })
            .or_insert(mtime);
    }
    Ok(Observation {
        max_mtime,
        saw_error_file,
    })
}

/// Files in `incoming` whose name starts with `<uid>#`, collected in one
/// pass so a late-arriving file from a concurrent writer is simply not part
/// of this round instead of being split across two outgoing directories.
async fn matching_files(incoming: &Path, uid: &SeriesUid) -> std::io::Result<Vec<PathBuf>> {
    let prefix = format!("{uid}#");
    let mut matches = Vec::new();
    let mut entries = tokio::fs::read_dir(incoming).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(&prefix) {
            matches.push(entry.path());
        }
    }
    Ok(matches)
}

async fn read_series_tags(incoming: &Path, uid: &SeriesUid) -> SeriesTags {
    let mut tags = SeriesTags::new();
    let Ok(mut entries) = tokio::fs::read_dir(incoming).await else {
        return tags;
    };
    let prefix = format!("{uid}#");
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(&prefix) && name.ends_with(".tags") {
            if let Ok(contents) = tokio::fs::read_to_string(entry.path()).await {
                tags.extend(rules::parse_tags(&contents));
            }
        }
    }
    tags
}

fn target_dir_name(uid: &SeriesUid, target: &common::target::TargetDescriptor) -> String {
    let label = target
        .target_name
        .as_deref()
        .unwrap_or(&target.target_aet_target);
    format!("{uid}#{label}")
}

async fn route_target(
    outgoing: &Path,
    uid: &SeriesUid,
    files: &[PathBuf],
    mut target: common::target::TargetDescriptor,
) -> anyhow::Result<()> {
    let dir = outgoing.join(target_dir_name(uid, &target));
    tokio::fs::create_dir_all(&dir).await?;
    markers::create_exclusive(&dir, Marker::Lock).await?;
    for src in files {
        let Some(name) = src.file_name() else {
            continue;
        };
        tokio::fs::copy(src, dir.join(name)).await?;
    }
    if target.series_uid.is_none() {
        target.series_uid = Some(uid.as_str().to_string());
    }
    target.write(&dir).await?;
    markers::remove(&dir, Marker::Lock).await?;
    Ok(())
}

/// Removes every picked-up file from `incoming/` once a series has been
/// staged to all of its matched targets. `incoming/` is router-read-only
/// except for this pickup (spec.md §6); leaving these files behind would
/// make every later scan re-qualify the same series as quiescent and
/// re-route it - duplicating delivery and wiping any retry progress the
/// dispatcher had already recorded in `target.json`.
async fn remove_picked_up_files(files: &[PathBuf]) -> std::io::Result<()> {
    for file in files {
        match tokio::fs::remove_file(file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Scans `cfg.incoming_folder`, evaluates routing rules for every quiescent
/// series, and stages one outgoing directory per matched target. Returns
/// after the in-flight series finishes if `cancel` fires mid-pass - never
/// mid-copy.
pub async fn scan_and_route(
    cfg: &Config,
    evaluator: &dyn RuleEvaluator,
    telemetry: &dyn Sink,
    metrics: Option<&Metrics>,
    clock: &dyn Clock,
    cancel: &tokio_util::sync::CancellationToken,
) -> anyhow::Result<RouterStats> {
    let incoming = Path::new(&cfg.incoming_folder);
    let outgoing = Path::new(&cfg.outgoing_folder);
    let observation = observe_incoming(incoming).await?;
    let trigger = Duration::from_secs(cfg.series_complete_trigger);
    let now = clock.now();

    let mut quiescent: Vec<SeriesUid> = observation
        .max_mtime
        .into_iter()
        .filter_map(|(uid, mtime)| {
            let age = now.duration_since(mtime).unwrap_or_default();
            (age >= trigger).then_some(uid)
        })
        .collect();
    quiescent.sort();

    if let Some(metrics) = metrics {
        metrics.increment("incoming.series", quiescent.len() as u64);
    }

    let mut stats = RouterStats {
        series_scanned: quiescent.len(),
        ..Default::default()
    };

    for uid in quiescent {
        if cancel.is_cancelled() {
            break;
        }
        let files = match matching_files(incoming, &uid).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(series_uid = %uid, error = %e, "failed to list series files");
                continue;
            }
        };
        if let Some(metrics) = metrics {
            metrics.increment("incoming.files", files.len() as u64);
        }
        let tags = read_series_tags(incoming, &uid).await;
        let targets = evaluator.evaluate(&uid, &tags);
        let mut routed = false;
        let mut any_error = false;
        for target in targets {
            match route_target(outgoing, &uid, &files, target).await {
                Ok(()) => {
                    routed = true;
                    stats.targets_created += 1;
                }
                Err(e) => {
                    any_error = true;
                    tracing::error!(series_uid = %uid, error = %e, "failed to route series to target");
                    telemetry
                        .send_series_event(common::telemetry::SeriesEvent::new(
                            common::telemetry::SeriesEventKind::Error,
                            Severity::Error,
                            &uid,
                            e.to_string(),
                        ))
                        .await;
                    telemetry
                        .send_process_event(ProcessEvent::new(
                            ProcessEventKind::Processing,
                            Severity::Error,
                            format!("routing failed for series {uid}"),
                        ))
                        .await;
                }
            }
        }
        if routed {
            stats.series_routed += 1;
            if !any_error {
                if let Err(e) = remove_picked_up_files(&files).await {
                    tracing::error!(series_uid = %uid, error = %e, "failed to remove picked-up files from incoming");
                }
            }
        }
    }

    if observation.saw_error_file {
        crate::error_files::reprocess(cfg, telemetry).await?;
    }

    Ok(stats)
}
