//! Registries shared between processes: leases and abandoned Jobs

use crate::common::{create_test_config, FakePage, FakeSite};
use site_scanner::config::Config;
use site_scanner::jobs::RawScanRequest;
use site_scanner::state::FailureReason;
use site_scanner::storage::{JobRegistry, SqliteJobRegistry};
use site_scanner::{Job, JobId, JobManager, JobStatus, ScanRequest};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> Config {
    let mut config = create_test_config();
    config.storage.database_path = dir.path().join("jobs.db").to_string_lossy().into_owned();
    config
}

fn db_path(config: &Config) -> &Path {
    Path::new(&config.storage.database_path)
}

fn slow_site() -> FakeSite {
    FakeSite::new(vec![
        ("/", FakePage::new(&["/a"])),
        ("/a", FakePage::new(&[]).with_delay(Duration::from_millis(1_000))),
    ])
}

#[tokio::test]
async fn test_second_manager_leaves_running_job_alone() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);

    // Short lease: the Job only survives if its owner keeps renewing it
    let registry = SqliteJobRegistry::open(db_path(&config))
        .unwrap()
        .with_lease(Duration::from_millis(300));
    let owner = JobManager::new(&config, Arc::new(registry), Arc::new(slow_site()), None);
    let id = owner
        .submit_raw(RawScanRequest::new(FakeSite::ORIGIN))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(700)).await;

    let observer = JobManager::from_config(&config).unwrap();
    assert!(!observer.get_job(id).unwrap().is_terminal());
    assert_eq!(observer.list_jobs().unwrap().len(), 1);

    let job = tokio::time::timeout(
        Duration::from_secs(20),
        owner.wait_for_terminal(id, Duration::from_millis(20), |_| {}),
    )
    .await
    .expect("job did not finish in time")
    .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.failure_reason.is_none());
    assert_eq!(job.pages_visited, 2);
}

#[tokio::test]
async fn test_abandoned_jobs_fail_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);
    let request =
        ScanRequest::from_raw(RawScanRequest::new(FakeSite::ORIGIN), &config.crawler).unwrap();

    let queued = JobId::new();
    let running = JobId::new();
    {
        // A process that exits without finishing or renewing its Jobs
        let registry = SqliteJobRegistry::open(db_path(&config))
            .unwrap()
            .with_lease(Duration::from_millis(50));
        registry.insert(&Job::new(queued, request.clone())).unwrap();
        registry.insert(&Job::new(running, request)).unwrap();
        assert!(registry.claim(running).unwrap());
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    let manager = JobManager::from_config(&config).unwrap();
    for id in [queued, running] {
        let job = manager.get_job(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_reason, Some(FailureReason::Internal));
        assert!(job.error_message.unwrap().contains("abandoned"));
    }
}
