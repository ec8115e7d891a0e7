//! Test-only fixtures: building incoming/outgoing directory trees with
//! controllable mtimes, the way tests need to simulate series arriving over
//! time and ageing past a retention window.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::target::TargetDescriptor;

/// Creates `dir/<series_uid>#<instance>.dcm` with empty contents.
pub async fn write_dcm(dir: &Path, series_uid: &str, instance: &str) -> PathBuf {
    let path = dir.join(format!("{series_uid}#{instance}.dcm"));
    tokio::fs::write(&path, b"").await.unwrap();
    path
}

/// Creates `dir/<series_uid>#<instance>.tags` with `key=value` lines.
pub async fn write_tags(dir: &Path, series_uid: &str, instance: &str, tags: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(format!("{series_uid}#{instance}.tags"));
    let body = tags
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect::<String>();
    tokio::fs::write(&path, body).await.unwrap();
    path
}

pub async fn write_target_json(dir: &Path, target: &TargetDescriptor) {
    target.write(dir).await.unwrap();
}

/// Sets both the access and modification time of `path` to `when`.
pub fn set_mtime(path: &Path, when: SystemTime) {
    filetime::set_file_mtime(path, filetime::FileTime::from_system_time(when)).unwrap();
}

/// `when` shifted `secs` seconds into the past, for ageing fixtures past a
/// retention window.
pub fn seconds_ago(secs: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(secs)
}
