//! Integration tests for manifest-based resume

use asos_downloader::downloader::config::{ResumeMode, RunConfig};
use asos_downloader::downloader::rate_limit::RecordingSleeper;
use asos_downloader::downloader::{quarter_windows, DownloadError, DownloadExecutor};
use asos_downloader::resume::{ResumeError, ResumeManifest, WindowCheckpoint};
use asos_downloader::StationId;
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::mock_source::MockAsos;

fn stations() -> Vec<StationId> {
    vec![StationId::parse("108").unwrap(), StationId::parse("119").unwrap()]
}

fn config(dir: &TempDir) -> RunConfig {
    RunConfig::new("test-key", stations(), 2022, 2023).with_data_dir(dir.path())
}

async fn run(config: RunConfig, source: Arc<MockAsos>) -> Result<asos_downloader::downloader::RunSummary, DownloadError> {
    DownloadExecutor::from_config(config)
        .unwrap()
        .with_source(source)
        .with_sleeper(Arc::new(RecordingSleeper::new()))
        .run()
        .await
}

#[tokio::test]
async fn test_manifest_written_with_window_ids() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    run(config.clone(), Arc::new(MockAsos::new(4))).await.unwrap();

    let path = config.paths().manifest_path();
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["schema_version"], "1.0.0");
    assert_eq!(raw["stations"], serde_json::json!(["108", "119"]));
    assert_eq!(raw["start_year"], 2022);
    assert_eq!(raw["end_year"], 2023);

    let manifest = ResumeManifest::load(&path).unwrap();
    let ids: Vec<&String> = manifest.windows().keys().collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(ids[0], "20220101_20220331");
    assert_eq!(ids[7], "20231001_20231231");

    let checkpoint = &manifest.windows()["20220401_20220630"];
    assert_eq!(checkpoint.record_count(), 8);
    assert_eq!(checkpoint.station_count(), 2);
}

#[tokio::test]
async fn test_prerecorded_windows_are_not_fetched() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let windows = quarter_windows(2022, 2023);

    let mut manifest = ResumeManifest::new(stations(), 2022, 2023);
    for window in &windows[..5] {
        manifest.mark_complete(WindowCheckpoint::completed(window, 0, 2));
    }
    manifest.save(&config.paths().manifest_path()).unwrap();

    let source = Arc::new(MockAsos::new(4));
    let summary = run(config, source.clone()).await.unwrap();

    assert_eq!(summary.windows_skipped, 5);
    assert_eq!(summary.windows_completed, 3);
    // 3 windows x 2 stations x 1 page
    assert_eq!(source.call_count(), 6);
    assert!(source
        .calls()
        .iter()
        .all(|r| r.start_stamp().as_str() >= "20230401"));
}

#[tokio::test]
async fn test_year_range_mismatch_names_reset() {
    let dir = TempDir::new().unwrap();
    run(config(&dir), Arc::new(MockAsos::new(1))).await.unwrap();

    let other = RunConfig::new("test-key", stations(), 2022, 2024).with_data_dir(dir.path());
    let err = run(other, Arc::new(MockAsos::new(1))).await.unwrap_err();

    match &err {
        DownloadError::Resume(ResumeError::ConfigMismatch { field, .. }) => {
            assert_eq!(*field, "years")
        }
        other => panic!("Expected ConfigMismatch, got {:?}", other),
    }
    assert!(err.to_string().contains("--resume reset"));
}

#[tokio::test]
async fn test_corrupt_manifest_fails_until_reset() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    std::fs::write(config.paths().manifest_path(), "{ not json").unwrap();

    let source = Arc::new(MockAsos::new(2));
    let result = run(config.clone(), source.clone()).await;
    assert!(matches!(
        result,
        Err(DownloadError::Resume(ResumeError::DeserializationError(_)))
    ));
    assert_eq!(source.call_count(), 0);

    let summary = run(config.with_resume(ResumeMode::Reset), Arc::new(MockAsos::new(2)))
        .await
        .unwrap();
    assert_eq!(summary.windows_completed, 8);
}

#[tokio::test]
async fn test_resume_off_ignores_existing_manifest() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    run(config.clone(), Arc::new(MockAsos::new(1))).await.unwrap();

    let source = Arc::new(MockAsos::new(1));
    let summary = run(config.with_resume(ResumeMode::Off), source.clone())
        .await
        .unwrap();

    assert_eq!(summary.windows_skipped, 0);
    assert_eq!(source.call_count(), 16);
}
