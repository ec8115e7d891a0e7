//! End-to-end router scenarios (spec.md §8).

use std::io::Write;
use std::time::SystemTime;

use common::clock::FixedClock;
use common::rules::{GlobRuleEvaluator, Rule};
use common::telemetry::NullSink;
use globset::Glob;
use router::scan_and_route;
use tokio_util::sync::CancellationToken;

fn config(incoming: &std::path::Path, outgoing: &std::path::Path, trigger: u64) -> common::config::Config {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
incoming_folder = {incoming:?}
outgoing_folder = {outgoing:?}
success_folder = "unused"
discard_folder = "unused"
error_folder = "unused"
series_complete_trigger = {trigger}
router_scan_interval = 10
cleaner_scan_interval = 3600
retention = 604800
offpeak_start = "22:00"
offpeak_end = "06:00"
"#
    )
    .unwrap();
    common::config::Config::load(file.path()).unwrap()
}

fn site_x_rule() -> Rule {
    Rule {
        tag: "Modality".to_string(),
        pattern: Glob::new("CT").unwrap(),
        target: common::target::TargetDescriptor {
            target_ip: "10.0.0.1".to_string(),
            target_port: 104,
            target_aet_target: "SITEX".to_string(),
            target_aet_source: None,
            target_name: Some("siteX".to_string()),
            series_uid: None,
            retries: 0,
            next_retry_at: None,
        },
    }
}

/// Scenario 1 (happy path, router half): two instances of series `A`
/// arrive together, both age past `series_complete_trigger`, and the
/// router stages exactly one `outgoing/A#siteX/` directory holding both
/// `.dcm` files plus a `target.json` matching the configured rule.
#[tokio::test]
async fn happy_path_stages_one_target_directory_with_both_instances() {
    let incoming = tempfile::tempdir().unwrap();
    let outgoing = tempfile::tempdir().unwrap();

    common::testutils::write_dcm(incoming.path(), "A", "1").await;
    common::testutils::write_dcm(incoming.path(), "A", "2").await;
    let tags1 = common::testutils::write_tags(incoming.path(), "A", "1", &[("Modality", "CT")]).await;
    let tags2 = common::testutils::write_tags(incoming.path(), "A", "2", &[("Modality", "CT")]).await;
    let arrival = common::testutils::seconds_ago(61);
    common::testutils::set_mtime(&tags1, arrival);
    common::testutils::set_mtime(&tags2, arrival);

    let cfg = config(incoming.path(), outgoing.path(), 60);
    let evaluator = GlobRuleEvaluator::new(vec![site_x_rule()]);
    let clock = FixedClock(SystemTime::now());
    let cancel = CancellationToken::new();

    let stats = scan_and_route(&cfg, &evaluator, &NullSink, None, &clock, &cancel)
        .await
        .unwrap();
    assert_eq!(stats.series_routed, 1);

    let dest = outgoing.path().join("A#siteX");
    assert!(dest.join("A#1.dcm").exists());
    assert!(dest.join("A#2.dcm").exists());
    let target = common::target::TargetDescriptor::read_if_valid(&dest)
        .await
        .expect("target.json should be valid once staged");
    assert_eq!(target.target_ip, "10.0.0.1");
    assert_eq!(target.target_port, 104);
    assert_eq!(target.target_aet_target, "SITEX");

    assert!(!incoming.path().join("A#1.dcm").exists());
    assert!(!incoming.path().join("A#2.dcm").exists());
    assert!(!tags1.exists());
    assert!(!tags2.exists());
}

/// Round-trip property: a series whose `.tags` mtime is refreshed (e.g. a
/// late-arriving instance) is not re-dispatched until the completion
/// threshold re-expires from the new mtime.
#[tokio::test]
async fn refreshed_mtime_resets_the_quiescence_window() {
    let incoming = tempfile::tempdir().unwrap();
    let outgoing = tempfile::tempdir().unwrap();

    let tags = common::testutils::write_tags(incoming.path(), "A", "1", &[("Modality", "CT")]).await;
    common::testutils::set_mtime(&tags, common::testutils::seconds_ago(5));

    let cfg = config(incoming.path(), outgoing.path(), 60);
    let evaluator = GlobRuleEvaluator::new(vec![site_x_rule()]);
    let clock = FixedClock(SystemTime::now());
    let cancel = CancellationToken::new();

    let stats = scan_and_route(&cfg, &evaluator, &NullSink, None, &clock, &cancel)
        .await
        .unwrap();
    assert_eq!(stats.series_routed, 0);
    assert!(!outgoing.path().join("A#siteX").exists());
}
