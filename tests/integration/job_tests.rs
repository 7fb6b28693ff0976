//! Job lifecycle scenarios through the JobManager

use crate::common::{create_test_config, create_test_manager, FakePage, FakeSite, FAKE_SCREENSHOT};
use async_trait::async_trait;
use site_scanner::jobs::RawScanRequest;
use site_scanner::lookup::{DomainInfo, DomainLookup, LookupError};
use site_scanner::state::FailureReason;
use site_scanner::{Job, JobId, JobManager, JobStatus, ScanError};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(20);

async fn wait(manager: &JobManager, id: JobId) -> Job {
    tokio::time::timeout(
        Duration::from_secs(20),
        manager.wait_for_terminal(id, POLL, |_| {}),
    )
    .await
    .expect("job did not finish in time")
    .unwrap()
}

fn request(max_pages: u32) -> RawScanRequest {
    RawScanRequest {
        max_pages: Some(max_pages),
        ..RawScanRequest::new(FakeSite::ORIGIN)
    }
}

fn three_link_site() -> FakeSite {
    FakeSite::new(vec![
        ("/", FakePage::new(&["/contact", "/about", "/blog"])),
        ("/about", FakePage::new(&["/"])),
        ("/blog", FakePage::new(&["/about"])),
        ("/contact", FakePage::new(&[])),
    ])
}

fn archive_entries(bytes: Vec<u8>) -> usize {
    zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len()
}

#[tokio::test]
async fn test_scan_completes_in_bfs_order() {
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);

    let id = manager.submit_raw(request(10)).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.pages_visited, 4);
    assert!(job.failure_reason.is_none());

    let report = job.report.as_ref().unwrap();
    let urls: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/",
            "https://site.test/about",
            "https://site.test/blog",
            "https://site.test/contact",
        ]
    );
    assert!(!report.no_data);
    assert!((0.0..=100.0).contains(&report.aggregate_score));
    assert!(report.domain.is_none());

    assert!(job.has_screenshot);
    assert!(job.has_html_archive);
    assert!(job.warnings.is_empty());
    assert_eq!(manager.fetch_screenshot(id).unwrap(), FAKE_SCREENSHOT);
    assert_eq!(archive_entries(manager.fetch_html_archive(id).unwrap()), 4);

    let content = manager.fetch_html_content(id).unwrap();
    let archived: Vec<&str> = content.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(archived, urls);
    assert!(content[1].html.contains("<title>/about</title>"));
}

#[tokio::test]
async fn test_start_redirect_to_www_scores_whole_site() {
    let site = FakeSite::new(vec![(
        "/",
        FakePage::new(&[]).redirecting_to("https://www.site.test/"),
    )])
    .with_foreign_page("www.site.test", "/", FakePage::new(&["/a", "/b", "/c"]))
    .with_foreign_page("www.site.test", "/a", FakePage::new(&[]))
    .with_foreign_page("www.site.test", "/b", FakePage::new(&[]))
    .with_foreign_page("www.site.test", "/c", FakePage::new(&[]));

    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(site), None);

    let id = manager.submit_raw(request(10)).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    let report = job.report.as_ref().unwrap();
    assert_eq!(report.pages_crawled, 4);
    assert_eq!(report.links.total, 3);
    assert_eq!(report.links.internal, 3);
    assert_eq!(report.links.external, 0);
}

#[tokio::test]
async fn test_single_page_budget() {
    let site = FakeSite::new(vec![
        ("/", FakePage::new(&["/", "/a", "/b", "/c", "/d"])),
        ("/a", FakePage::new(&[])),
        ("/b", FakePage::new(&[])),
        ("/c", FakePage::new(&[])),
        ("/d", FakePage::new(&[])),
    ]);
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(site), None);

    let id = manager.submit_raw(request(1)).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.pages_visited, 1);
    assert_eq!(job.report.unwrap().pages.len(), 1);
}

#[tokio::test]
async fn test_start_timeout_fails_job() {
    let site = FakeSite::new(vec![(
        "/",
        FakePage::new(&["/a"]).with_delay(Duration::from_secs(5)),
    )]);
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(site), None);

    let raw = RawScanRequest {
        page_timeout_ms: Some(200),
        ..request(10)
    };
    let id = manager.submit_raw(raw).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure_reason, Some(FailureReason::StartUrlUnreachable));
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("start URL unreachable"));
    assert!(job.report.is_none());
    assert!(!job.has_screenshot);
    assert!(!job.has_html_archive);

    assert!(matches!(
        manager.fetch_html_archive(id),
        Err(ScanError::NotFound(_))
    ));
    assert!(matches!(
        manager.fetch_screenshot(id),
        Err(ScanError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_cancel_mid_crawl_fails_job() {
    let mut pages = vec![(
        "/",
        FakePage::new(&["/p1", "/p2", "/p3", "/p4", "/p5", "/p6", "/p7", "/p8", "/p9"]),
    )];
    let slow = Duration::from_millis(300);
    pages.push(("/p1", FakePage::new(&[])));
    for path in ["/p2", "/p3", "/p4", "/p5", "/p6", "/p7", "/p8", "/p9"] {
        pages.push((path, FakePage::new(&[]).with_delay(slow)));
    }

    let mut config = create_test_config();
    config.crawler.max_concurrent_pages_open = 1;
    let manager = create_test_manager(&config, Arc::new(FakeSite::new(pages)), None);

    let id = manager.submit_raw(request(10)).unwrap();

    tokio::time::timeout(Duration::from_secs(10), async {
        while manager.get_job(id).unwrap().pages_visited < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    manager.cancel(id).unwrap();

    let job = wait(&manager, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure_reason, Some(FailureReason::Cancelled));
    assert!(job.pages_visited < 10);
    assert!(job.report.is_none());
    assert!(!job.has_html_archive);
}

#[tokio::test]
async fn test_job_timeout_fails_job() {
    let mut pages = vec![("/", FakePage::new(&["/a", "/b", "/c", "/d", "/e"]))];
    for path in ["/a", "/b", "/c", "/d", "/e"] {
        pages.push((
            path,
            FakePage::new(&[]).with_delay(Duration::from_millis(500)),
        ));
    }

    let mut config = create_test_config();
    config.scanner.job_timeout_secs = 1;
    config.crawler.max_concurrent_pages_open = 1;
    let manager = create_test_manager(&config, Arc::new(FakeSite::new(pages)), None);

    let id = manager.submit_raw(request(10)).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure_reason, Some(FailureReason::Timeout));
    assert!(job.report.is_none());
}

#[tokio::test]
async fn test_terminal_job_ignores_cancel() {
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);

    let id = manager.submit_raw(request(10)).unwrap();
    let done = wait(&manager, id).await;

    manager.cancel(id).unwrap();
    let again = manager.get_job(id).unwrap();
    assert_eq!(again.status, JobStatus::Completed);
    assert_eq!(again.completed_at, done.completed_at);
}

#[tokio::test]
async fn test_artifacts_not_ready_while_running() {
    let site = FakeSite::new(vec![(
        "/",
        FakePage::new(&[]).with_delay(Duration::from_millis(500)),
    )]);
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(site), None);

    let id = manager.submit_raw(request(1)).unwrap();
    assert!(matches!(
        manager.fetch_html_archive(id),
        Err(ScanError::NotReady { .. })
    ));

    let job = wait(&manager, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(manager.fetch_html_archive(id).is_ok());
}

#[tokio::test]
async fn test_disabled_artifacts() {
    let mut config = create_test_config();
    config.artifacts.screenshots = false;
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);

    let raw = RawScanRequest {
        include_html: Some(false),
        ..request(10)
    };
    let id = manager.submit_raw(raw).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(!job.has_screenshot);
    assert!(!job.has_html_archive);
    assert!(job.warnings.is_empty());
    assert!(matches!(
        manager.fetch_screenshot(id),
        Err(ScanError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_job() {
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);
    let id = JobId::new();

    assert!(matches!(manager.get_job(id), Err(ScanError::NotFound(_))));
    assert!(matches!(manager.delete_job(id), Err(ScanError::NotFound(_))));
    assert!(matches!(manager.cancel(id), Err(ScanError::NotFound(_))));
    assert!(matches!(
        manager.fetch_screenshot(id),
        Err(ScanError::NotFound(_))
    ));
    assert!(matches!(
        manager.fetch_html_content(id),
        Err(ScanError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_request_creates_no_job() {
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);

    let result = manager.submit_raw(RawScanRequest::new("not a url"));
    assert!(matches!(result, Err(ScanError::Validation(_))));

    let result = manager.submit_raw(request(0));
    assert!(matches!(result, Err(ScanError::Validation(_))));

    assert!(manager.list_jobs().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_and_delete() {
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);

    let first = manager.submit_raw(request(2)).unwrap();
    wait(&manager, first).await;
    let second = manager.submit_raw(request(10)).unwrap();
    wait(&manager, second).await;

    let listed = manager.list_jobs().unwrap();
    let ids: Vec<JobId> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(listed.iter().all(|s| s.aggregate_score.is_some()));

    manager.delete_job(first).unwrap();
    assert!(matches!(manager.get_job(first), Err(ScanError::NotFound(_))));
    assert!(matches!(
        manager.fetch_html_archive(first),
        Err(ScanError::NotFound(_))
    ));
    assert_eq!(manager.list_jobs().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_jobs_complete_independently() {
    let config = create_test_config();
    let manager = create_test_manager(&config, Arc::new(three_link_site()), None);

    let ids: Vec<JobId> = (1..=5)
        .map(|n| manager.submit_raw(request(n)).unwrap())
        .collect();

    for (n, id) in (1..=5).zip(ids) {
        let job = wait(&manager, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.pages_visited, n.min(4));
    }
}

struct StaticLookup;

#[async_trait]
impl DomainLookup for StaticLookup {
    async fn lookup(&self, domain: &str) -> Result<DomainInfo, LookupError> {
        Ok(DomainInfo {
            registrar: Some("Example Registrar".to_string()),
            ip_address: Some("192.0.2.1".to_string()),
            ..DomainInfo::empty(domain)
        })
    }
}

struct BrokenLookup;

#[async_trait]
impl DomainLookup for BrokenLookup {
    async fn lookup(&self, _domain: &str) -> Result<DomainInfo, LookupError> {
        Err(LookupError::Resolve("registry offline".to_string()))
    }
}

#[tokio::test]
async fn test_domain_metadata_attached() {
    let config = create_test_config();
    let manager = create_test_manager(
        &config,
        Arc::new(three_link_site()),
        Some(Arc::new(StaticLookup)),
    );

    let id = manager.submit_raw(request(1)).unwrap();
    let job = wait(&manager, id).await;

    let domain = job.report.unwrap().domain.unwrap();
    assert_eq!(domain.domain, "site.test");
    assert_eq!(domain.registrar.as_deref(), Some("Example Registrar"));
}

#[tokio::test]
async fn test_lookup_failure_does_not_fail_job() {
    let config = create_test_config();
    let manager = create_test_manager(
        &config,
        Arc::new(three_link_site()),
        Some(Arc::new(BrokenLookup)),
    );

    let id = manager.submit_raw(request(1)).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.report.unwrap().domain,
        Some(DomainInfo::empty("site.test"))
    );
}
