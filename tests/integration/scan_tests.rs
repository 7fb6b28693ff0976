//! End-to-end scans over HTTP
//!
//! These tests use wiremock to serve a small site and run full Jobs through
//! the real HTTP renderer.

use crate::common::{create_test_config, create_test_manager};
use site_scanner::artifacts::ArtifactError;
use site_scanner::output::export_scan;
use site_scanner::render::HttpRenderer;
use site_scanner::state::FailureReason;
use site_scanner::{Job, JobId, JobManager, JobStatus, ScanError};
use site_scanner::jobs::RawScanRequest;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_site(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!(
            r#"<html><head><title>Mock Home Page For Testing</title>
            <meta name="description" content="A small site served by a mock server for scanner tests.">
            <link rel="canonical" href="{}/"></head>
            <body><h1>Welcome</h1><h2>Sections</h2>
            <p>Some words about this site and what it offers to visitors.</p>
            <img src="/logo.png" alt="Logo">
            <a href="/about">About</a>
            <a href="{}/missing">Missing</a>
            <a href="https://external.example.org/">Elsewhere</a>
            </body></html>"#,
            base, base
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_response(
            r#"<html><head><title>About</title></head>
            <body><h1>About</h1><a href="/">Home</a></body></html>"#
                .to_string(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn create_http_manager() -> JobManager {
    let config = create_test_config();
    let renderer = HttpRenderer::new(&config.user_agent).unwrap();
    create_test_manager(&config, Arc::new(renderer), None)
}

async fn wait(manager: &JobManager, id: JobId) -> Job {
    tokio::time::timeout(
        Duration::from_secs(20),
        manager.wait_for_terminal(id, Duration::from_millis(20), |_| {}),
    )
    .await
    .expect("job did not finish in time")
    .unwrap()
}

#[tokio::test]
async fn test_http_scan_end_to_end() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let manager = create_http_manager();

    let id = manager.submit_raw(RawScanRequest::new(server.uri())).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.pages_visited, 3);

    let report = job.report.as_ref().unwrap();
    assert_eq!(report.pages_crawled, 3);
    assert_eq!(report.pages_scored, 2);
    assert!(!report.no_data);
    assert!(report.aggregate_score > 0.0 && report.aggregate_score <= 100.0);

    let missing = &report.pages[2];
    assert!(missing.url.ends_with("/missing"));
    assert_eq!(missing.status_code, Some(404));
    assert!(missing.scores.is_none());

    // Home links to /about, /missing and one external page; /about links home
    assert_eq!(report.links.total, 4);
    assert_eq!(report.links.external, 1);

    // The HTTP renderer cannot capture screenshots
    assert!(!job.has_screenshot);
    assert!(job.has_html_archive);
    assert_eq!(
        job.warnings,
        vec![ArtifactError::ScreenshotUnavailable.to_string()]
    );
    assert!(job.is_partial_success());

    let archive = manager.fetch_html_archive(id).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    assert_eq!(archive.len(), 2);

    // The 404 page has no archived HTML
    let content = manager.fetch_html_content(id).unwrap();
    assert_eq!(content.len(), 2);
    assert!(content[0].html.contains("Mock Home Page For Testing"));
    assert!(content[1].url.as_str().ends_with("/about"));
}

#[tokio::test]
async fn test_http_scan_unreachable_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let manager = create_http_manager();

    let id = manager.submit_raw(RawScanRequest::new(server.uri())).unwrap();
    let job = wait(&manager, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure_reason, Some(FailureReason::StartUrlUnreachable));
    assert!(matches!(
        manager.fetch_html_archive(id),
        Err(ScanError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_export_scan_files() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let manager = create_http_manager();

    let id = manager.submit_raw(RawScanRequest::new(server.uri())).unwrap();
    let job = wait(&manager, id).await;

    let dir = tempfile::tempdir().unwrap();
    let written = export_scan(&manager, &job, dir.path()).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            format!("scan_{}.json", id),
            format!("scan_{}.md", id),
            format!("scan_{}_html.zip", id),
        ]
    );

    let markdown = std::fs::read_to_string(&written[1]).unwrap();
    assert!(markdown.contains("- **Status**: completed"));
}
