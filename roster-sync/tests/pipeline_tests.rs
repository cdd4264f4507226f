//! End-to-end batch runs over in-memory store and platform.

mod support;

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use roster_core::{HeaderMap, IngestError, Stage};
use roster_sync::pipeline::{run_with, RunOptions};
use roster_sync::preflight::{CHECK_PLATFORM, CHECK_STORE};
use roster_sync::SyncError;

use support::{config, Call, FakePlatform, FakeStore};

const ROSTER: &str = "\
รายชื่อ,คำนำหน้า,ชื่อจริง,นามสกุล,ชื่อเล่น,สถานะ
Alice A,,Alice,A,Al,accepted
,,,B,,accepted
Bob B,,Bob,B,Bo,accepted
Carol C,,Carol,C,Cc,accepted
";

fn write_roster(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("roster.csv");
    fs::write(&path, body).expect("write roster");
    path
}

fn options(roster_path: PathBuf) -> RunOptions {
    RunOptions {
        roster_path,
        dry_run: false,
        headers: HeaderMap::default(),
    }
}

fn abc_store() -> FakeStore {
    FakeStore::new()
        .with_identity("Alice", "A", "u-a")
        .with_link("u-a", "900")
        .with_identity("Bob", "B", "u-b")
}

#[tokio::test]
async fn full_run_from_csv() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_roster(&dir, ROSTER);
    let store = abc_store();
    let platform = FakePlatform::new();
    let mut config = config();
    config.grant_spacing = std::time::Duration::ZERO;

    let report = run_with(&store, &platform, &config, &options(path))
        .await
        .expect("run");

    assert_eq!(report.counters.total, 3, "incomplete row is not counted");
    assert_eq!(report.counters.granted, 1);
    assert_eq!(report.counters.failed, 2);
    assert_eq!(
        platform.calls(),
        vec![
            Call::GroupInfo("111".to_string()),
            Call::Grant("900".to_string()),
        ]
    );
    let text = report.render();
    assert!(text.contains("1. Bob B\n   Reason: no linked external account"));
    assert!(text.contains("2. Carol C\n   Reason: not found in identity store"));
}

#[tokio::test]
async fn missing_roster_aborts_before_any_call() {
    let dir = TempDir::new().expect("tempdir");
    let store = abc_store();
    let platform = FakePlatform::new();

    let err = run_with(
        &store,
        &platform,
        &config(),
        &options(dir.path().join("absent.csv")),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SyncError::Ingest(IngestError::NotFound { .. })));
    assert!(store.calls().is_empty());
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn unreachable_store_aborts_before_any_record() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_roster(&dir, ROSTER);
    let store = abc_store().with_failing_ping();
    let platform = FakePlatform::new();

    let err = run_with(&store, &platform, &config(), &options(path))
        .await
        .unwrap_err();

    match err {
        SyncError::Preflight { check, .. } => assert_eq!(check, CHECK_STORE),
        other => panic!("expected preflight error, got {other:?}"),
    }
    assert_eq!(store.calls(), vec![Call::Ping]);
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn unauthorized_platform_aborts_before_any_record() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_roster(&dir, ROSTER);
    let store = abc_store();
    let platform = FakePlatform::new().with_failing_group();

    let err = run_with(&store, &platform, &config(), &options(path))
        .await
        .unwrap_err();

    match &err {
        SyncError::Preflight { check, reason } => {
            assert_eq!(*check, CHECK_PLATFORM);
            assert!(reason.contains("401"), "{reason}");
        }
        other => panic!("expected preflight error, got {other:?}"),
    }
    assert_eq!(store.calls(), vec![Call::Ping]);
}

#[tokio::test]
async fn dry_run_from_csv_reports_would_grant() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_roster(&dir, ROSTER);
    let store = abc_store();
    let platform = FakePlatform::new();
    let mut opts = options(path);
    opts.dry_run = true;

    let report = run_with(&store, &platform, &config(), &opts)
        .await
        .expect("run");

    assert_eq!(report.outcomes[0].stage, Stage::WouldGrant);
    assert_eq!(platform.calls(), vec![Call::GroupInfo("111".to_string())]);
    assert!(report.render().contains("PROCESSING SUMMARY (dry run)"));
}

#[tokio::test]
async fn header_only_roster_yields_empty_report() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_roster(&dir, "รายชื่อ,คำนำหน้า,ชื่อจริง,นามสกุล,ชื่อเล่น,สถานะ\n");
    let store = FakeStore::new();
    let platform = FakePlatform::new();

    let report = run_with(&store, &platform, &config(), &options(path))
        .await
        .expect("run");
    assert_eq!(report.counters.total, 0);
    assert!(report.render().contains("Success rate:                 0.0%"));
}
