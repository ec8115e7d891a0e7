//! End-to-end cleaner scenarios (spec.md §8).

use std::time::{Duration, SystemTime};

use chrono::NaiveTime;
use cleaner::{clean_dir, is_offpeak};
use common::clock::FixedClock;
use common::telemetry::NullSink;

/// Scenario 5: the offpeak predicate crosses midnight correctly, and a
/// sweep over directories aged `{10d, 5d, 1h}` with `retention=2d` removes
/// only the first two, oldest first.
#[tokio::test]
async fn offpeak_sweep_removes_only_directories_past_retention_oldest_first() {
    assert!(is_offpeak("22:00", "06:00", NaiveTime::from_hms_opt(3, 15, 0).unwrap()).unwrap());
    assert!(!is_offpeak("22:00", "06:00", NaiveTime::from_hms_opt(9, 0, 0).unwrap()).unwrap());

    let root = tempfile::tempdir().unwrap();
    let ten_days = root.path().join("A#siteX");
    let five_days = root.path().join("B#siteX");
    let one_hour = root.path().join("C#siteX");
    tokio::fs::create_dir(&ten_days).await.unwrap();
    tokio::fs::create_dir(&five_days).await.unwrap();
    tokio::fs::create_dir(&one_hour).await.unwrap();
    common::testutils::set_mtime(&ten_days, common::testutils::seconds_ago(10 * 24 * 3600));
    common::testutils::set_mtime(&five_days, common::testutils::seconds_ago(5 * 24 * 3600));
    common::testutils::set_mtime(&one_hour, common::testutils::seconds_ago(3600));

    let clock = FixedClock(SystemTime::now());
    let stats = clean_dir(root.path(), Duration::from_secs(2 * 24 * 3600), &NullSink, &clock)
        .await
        .unwrap();

    assert_eq!(stats.scanned, 2);
    assert_eq!(stats.removed, 2);
    assert!(!ten_days.exists());
    assert!(!five_days.exists());
    assert!(one_hour.exists());
}

/// Scenario 6: a directory with no `#`-delimited filename at all is still
/// deleted past retention, reporting the sentinel series UID.
#[tokio::test]
async fn directory_without_series_marker_falls_back_to_sentinel_uid() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("orphan");
    tokio::fs::create_dir(&dir).await.unwrap();
    tokio::fs::write(dir.join("notes.txt"), b"no series marker here")
        .await
        .unwrap();
    common::testutils::set_mtime(&dir, common::testutils::seconds_ago(10 * 24 * 3600));

    let clock = FixedClock(SystemTime::now());
    let stats = clean_dir(root.path(), Duration::from_secs(2 * 24 * 3600), &NullSink, &clock)
        .await
        .unwrap();

    assert_eq!(stats.removed, 1);
    assert!(!dir.exists());
}
