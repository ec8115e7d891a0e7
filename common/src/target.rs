//! `target.json` - the per-outgoing-directory descriptor of a DICOM send target.

use serde::{Deserialize, Serialize};

/// Mirrors the schema written by the router and consumed by the dispatcher.
///
/// `retries` and `next_retry_at` are dispatcher-owned retry state; the router
/// never sets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub target_ip: String,
    pub target_port: u16,
    pub target_aet_target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_aet_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_uid: Option<String>,

    #[serde(default)]
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<f64>,
}

impl TargetDescriptor {
    /// Mandatory keys: `target_ip`, `target_port`, `target_aet_target`, all non-empty.
    pub fn is_valid(&self) -> bool {
        !self.target_ip.is_empty() && !self.target_aet_target.is_empty() && self.target_port != 0
    }

    /// Reads and parses `target.json` from `dir`. A missing or unparsable
    /// file, or one missing a mandatory key, is reported as `None` rather
    /// than an error - callers treat the directory as "not ready", matching
    /// `is_target_json_valid` in the original router.
    pub async fn read_if_valid(dir: &std::path::Path) -> Option<Self> {
        let path = dir.join("target.json");
        let contents = tokio::fs::read(&path).await.ok()?;
        let target: Self = serde_json::from_slice(&contents).ok()?;
        if target.is_valid() {
            Some(target)
        } else {
            None
        }
    }

    pub async fn write(&self, dir: &std::path::Path) -> std::io::Result<()> {
        let path = dir.join("target.json");
        let contents = serde_json::to_vec(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(path, contents).await
    }
}
