//! Shared predicates over an outgoing directory's lifecycle state.

use crate::markers::{self, Marker};
use crate::target::TargetDescriptor;

/// Counts entries in `dir` whose filename ends in `.dcm`.
pub async fn dcm_file_count(dir: &std::path::Path) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().ends_with(".dcm") {
            count += 1;
        }
    }
    Ok(count)
}

/// The "actionable" invariant from the data model: no `.lock`, no `.error`,
/// no `.sending`, at least one `*.dcm`, and a valid `target.json`.
///
/// Returns the parsed descriptor when actionable, `None` otherwise - a
/// malformed or missing `target.json` is not an error, just "not actionable".
pub async fn actionable_target(dir: &std::path::Path) -> Option<TargetDescriptor> {
    if markers::exists(dir, Marker::Lock)
        || markers::exists(dir, Marker::Error)
        || markers::exists(dir, Marker::Sending)
    {
        return None;
    }
    if dcm_file_count(dir).await.unwrap_or(0) == 0 {
        return None;
    }
    TargetDescriptor::read_if_valid(dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::create_exclusive;

    async fn write_valid_target(dir: &std::path::Path) {
        let t = TargetDescriptor {
            target_ip: "10.0.0.1".to_string(),
            target_port: 104,
            target_aet_target: "SITEX".to_string(),
            target_aet_source: None,
            target_name: Some("siteX".to_string()),
            series_uid: Some("1.2.3".to_string()),
            retries: 0,
            next_retry_at: None,
        };
        t.write(dir).await.unwrap();
    }

    #[tokio::test]
    async fn not_actionable_without_dcm_files() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_target(dir.path()).await;
        assert!(actionable_target(dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn not_actionable_with_lock() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_target(dir.path()).await;
        tokio::fs::write(dir.path().join("1.2.3#a.dcm"), b"")
            .await
            .unwrap();
        create_exclusive(dir.path(), Marker::Lock).await.unwrap();
        assert!(actionable_target(dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn actionable_when_all_invariants_hold() {
        let dir = tempfile::tempdir().unwrap();
        write_valid_target(dir.path()).await;
        tokio::fs::write(dir.path().join("1.2.3#a.dcm"), b"")
            .await
            .unwrap();
        let target = actionable_target(dir.path()).await;
        assert!(target.is_some());
    }
}
