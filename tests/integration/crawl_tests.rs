//! Crawl engine scenarios over an in-memory site

use crate::common::{FakePage, FakeSite, FAKE_SCREENSHOT};
use site_scanner::crawler::{CancelFlag, CrawlEngine, CrawlError, CrawlSettings, PageFetcher};
use site_scanner::render::RendererPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn create_engine(site: Arc<FakeSite>, page_timeout: Duration) -> CrawlEngine {
    let pool = RendererPool::new(site, 4);
    CrawlEngine::new(PageFetcher::new(pool, page_timeout))
}

fn settings(max_pages: u32) -> CrawlSettings {
    CrawlSettings {
        max_pages,
        concurrency: 3,
        capture_screenshot: true,
        allowed_domains: Vec::new(),
    }
}

/// Ten pages in a ring, each also linking home
fn ring_site() -> FakeSite {
    let mut pages = vec![("/", FakePage::new(&["/p0"]))];
    let paths: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    for i in 0..10 {
        let next = paths[(i + 1) % 10].clone();
        let page = FakePage::new(&[next.as_str(), "/"]);
        pages.push((paths[i].as_str(), page));
    }
    FakeSite::new(pages)
}

#[tokio::test]
async fn test_single_page_budget_leaves_frontier_unvisited() {
    let site = Arc::new(FakeSite::new(vec![
        ("/", FakePage::new(&["/", "/a", "/b", "/c", "/d"])),
        ("/a", FakePage::new(&[])),
        ("/b", FakePage::new(&[])),
        ("/c", FakePage::new(&[])),
        ("/d", FakePage::new(&[])),
    ]));

    let output = create_engine(site.clone(), Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings(1), &CancelFlag::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(output.pages.len(), 1);
    assert_eq!(output.unvisited.len(), 4);
    assert_eq!(site.rendered().len(), 1);
}

#[tokio::test]
async fn test_disconnected_start_page() {
    let site = Arc::new(FakeSite::new(vec![("/", FakePage::new(&[]))]));

    let output = create_engine(site, Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings(10), &CancelFlag::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(output.pages.len(), 1);
    assert!(output.unvisited.is_empty());
    assert_eq!(output.screenshot.as_deref(), Some(FAKE_SCREENSHOT));
}

#[tokio::test]
async fn test_budget_never_exceeded_and_urls_unique() {
    for max_pages in 1..=12 {
        let site = Arc::new(ring_site());
        let output = create_engine(site, Duration::from_secs(1))
            .crawl(FakeSite::start_url(), &settings(max_pages), &CancelFlag::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(output.pages.len(), (max_pages as usize).min(11));

        let unique: HashSet<_> = output.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(unique.len(), output.pages.len());
    }
}

#[tokio::test]
async fn test_identical_sites_crawl_identically() {
    let first = create_engine(Arc::new(ring_site()), Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings(8), &CancelFlag::new(), |_| {})
        .await
        .unwrap();
    let second = create_engine(Arc::new(ring_site()), Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings(8), &CancelFlag::new(), |_| {})
        .await
        .unwrap();

    let urls = |o: &site_scanner::crawler::CrawlOutput| {
        o.pages.iter().map(|p| p.url.to_string()).collect::<Vec<_>>()
    };
    assert_eq!(urls(&first), urls(&second));
}

#[tokio::test]
async fn test_slow_page_times_out_without_aborting() {
    let site = Arc::new(FakeSite::new(vec![
        ("/", FakePage::new(&["/fast", "/slow"])),
        ("/fast", FakePage::new(&[])),
        (
            "/slow",
            FakePage::new(&[]).with_delay(Duration::from_secs(5)),
        ),
    ]));

    let output = create_engine(site, Duration::from_millis(200))
        .crawl(FakeSite::start_url(), &settings(10), &CancelFlag::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(output.pages.len(), 3);
    let slow = &output.pages[2];
    assert_eq!(slow.url.path(), "/slow");
    assert!(slow.html.is_none());
    assert!(!slow.is_success());
}

#[tokio::test]
async fn test_start_timeout_is_fatal() {
    let site = Arc::new(FakeSite::new(vec![(
        "/",
        FakePage::new(&["/a"]).with_delay(Duration::from_secs(5)),
    )]));

    let result = create_engine(site, Duration::from_millis(100))
        .crawl(FakeSite::start_url(), &settings(10), &CancelFlag::new(), |_| {})
        .await;

    match result {
        Err(CrawlError::StartUrlUnreachable(detail)) => assert!(detail.contains("timed out")),
        other => panic!("expected start URL failure, got {:?}", other.map(|o| o.pages.len())),
    }
}

#[tokio::test]
async fn test_error_status_on_start_is_fatal() {
    let site = Arc::new(FakeSite::new(vec![(
        "/",
        FakePage::new(&[]).with_status(500),
    )]));

    let result = create_engine(site, Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings(10), &CancelFlag::new(), |_| {})
        .await;

    assert!(matches!(result, Err(CrawlError::StartUrlUnreachable(_))));
}

#[tokio::test]
async fn test_redirect_target_not_revisited() {
    let site = Arc::new(FakeSite::new(vec![
        ("/", FakePage::new(&["/a-old", "/z-new"])),
        ("/a-old", FakePage::new(&[]).redirecting_to("/z-new")),
        ("/z-new", FakePage::new(&["/a-old", "/z-new"])),
    ]));

    let output = create_engine(site.clone(), Duration::from_secs(1))
        .crawl(
            FakeSite::start_url(),
            &CrawlSettings {
                concurrency: 1,
                ..settings(10)
            },
            &CancelFlag::new(),
            |_| {},
        )
        .await
        .unwrap();

    let paths: Vec<&str> = output.pages.iter().map(|p| p.url.path()).collect();
    assert_eq!(paths, vec!["/", "/a-old"]);
    assert_eq!(output.pages[1].final_url.path(), "/z-new");
    assert_eq!(site.rendered().len(), 2);
}

#[tokio::test]
async fn test_allowed_domains_followed() {
    let site = FakeSite::new(vec![(
        "/",
        FakePage::new(&[
            "https://cdn.site-assets.test/page",
            "https://tracker.test/pixel",
        ]),
    )])
    .with_foreign_page("cdn.site-assets.test", "/page", FakePage::new(&[]));

    let settings = CrawlSettings {
        allowed_domains: vec!["*.site-assets.test".to_string()],
        ..settings(10)
    };

    let output = create_engine(Arc::new(site), Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings, &CancelFlag::new(), |_| {})
        .await
        .unwrap();

    let urls: Vec<String> = output.pages.iter().map(|p| p.url.to_string()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/".to_string(),
            "https://cdn.site-assets.test/page".to_string()
        ]
    );
}

#[tokio::test]
async fn test_cancel_mid_crawl() {
    let mut pages = vec![(
        "/",
        FakePage::new(&["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"]),
    )];
    for path in ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"] {
        pages.push((path, FakePage::new(&[]).with_delay(Duration::from_millis(50))));
    }
    let site = Arc::new(FakeSite::new(pages));

    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let result = create_engine(site.clone(), Duration::from_secs(1))
        .crawl(
            FakeSite::start_url(),
            &CrawlSettings {
                concurrency: 1,
                ..settings(10)
            },
            &cancel,
            move |visited| {
                if visited == 2 {
                    trigger.cancel();
                }
            },
        )
        .await;

    assert!(matches!(result, Err(CrawlError::Cancelled)));
    assert_eq!(site.rendered().len(), 2);
}

#[tokio::test]
async fn test_start_redirect_to_www_follows_new_host() {
    let site = FakeSite::new(vec![(
        "/",
        FakePage::new(&[]).redirecting_to("https://www.site.test/"),
    )])
    .with_foreign_page("www.site.test", "/", FakePage::new(&["/a", "/b", "/c"]))
    .with_foreign_page("www.site.test", "/a", FakePage::new(&["https://site.test/a"]))
    .with_foreign_page("www.site.test", "/b", FakePage::new(&[]))
    .with_foreign_page("www.site.test", "/c", FakePage::new(&[]));

    let output = create_engine(Arc::new(site), Duration::from_secs(1))
        .crawl(FakeSite::start_url(), &settings(10), &CancelFlag::new(), |_| {})
        .await
        .unwrap();

    let urls: Vec<String> = output.pages.iter().map(|p| p.url.to_string()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/".to_string(),
            "https://www.site.test/a".to_string(),
            "https://www.site.test/b".to_string(),
            "https://www.site.test/c".to_string(),
        ]
    );
    assert_eq!(output.pages[0].final_url.as_str(), "https://www.site.test/");
    // Back-links to the bare host are outside the rescoped origin
    assert!(output.unvisited.is_empty());
}
