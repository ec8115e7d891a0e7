//! Series identification.
//!
//! A series is a set of DICOM instances sharing a UID, physically represented
//! by files whose basenames begin with `<series_uid>#`.

use std::fmt;

/// Sentinel reported when a directory carries no `#`-delimited filename at all.
pub const UNKNOWN_SERIES_UID: &str = "series_uid-not-found";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesUid(String);

impl SeriesUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_SERIES_UID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SeriesUid> for String {
    fn from(uid: SeriesUid) -> Self {
        uid.0
    }
}

/// Splits `filename` on the first `#` and returns the prefix as a [`SeriesUid`].
/// Returns `None` if `filename` does not contain `#`.
pub fn series_uid_of(filename: &str) -> Option<SeriesUid> {
    filename.split_once('#').map(|(uid, _)| SeriesUid::new(uid))
}

/// Finds the series UID for a directory by inspecting its immediate entries:
/// the first filename containing `#` wins, its prefix is the UID. Falls back
/// to [`SeriesUid::unknown`] when no such filename exists.
pub async fn find_series_uid(dir: &std::path::Path) -> SeriesUid {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return SeriesUid::unknown(),
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(uid) = series_uid_of(name) {
            return uid;
        }
    }
    SeriesUid::unknown()
}
