//! Shared fixtures: an in-memory site served through the renderer interface

use async_trait::async_trait;
use site_scanner::config::Config;
use site_scanner::lookup::DomainLookup;
use site_scanner::render::{RenderError, RenderResult, Renderer};
use site_scanner::storage::SqliteJobRegistry;
use site_scanner::JobManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Bytes returned as the screenshot of any page rendered with capture on
pub const FAKE_SCREENSHOT: &[u8] = b"\x89PNG fake screenshot";

/// One page of a fake site
#[derive(Clone)]
pub struct FakePage {
    pub status: u16,
    pub links: Vec<String>,
    pub delay: Duration,

    /// Path the page redirects to, if any
    pub redirect_to: Option<String>,
}

impl FakePage {
    pub fn new(links: &[&str]) -> Self {
        Self {
            status: 200,
            links: links.iter().map(|l| l.to_string()).collect(),
            delay: Duration::ZERO,
            redirect_to: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn redirecting_to(mut self, path: &str) -> Self {
        self.redirect_to = Some(path.to_string());
        self
    }
}

/// A site graph served from memory, keyed by `host + path`
///
/// Unknown pages fail with a network error.
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    rendered: Mutex<Vec<String>>,
}

impl FakeSite {
    pub const ORIGIN: &'static str = "https://site.test";

    /// Builds a site on [`FakeSite::ORIGIN`] from `(path, page)` pairs
    pub fn new(pages: Vec<(&str, FakePage)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(path, page)| (format!("site.test{}", path), page))
                .collect(),
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Adds a page on another host
    pub fn with_foreign_page(mut self, host: &str, path: &str, page: FakePage) -> Self {
        self.pages.insert(format!("{}{}", host, path), page);
        self
    }

    pub fn start_url() -> Url {
        Url::parse(&format!("{}/", Self::ORIGIN)).unwrap()
    }

    /// URLs rendered so far, in render order
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    fn html_for(page: &FakePage, title: &str) -> String {
        let anchors: String = page
            .links
            .iter()
            .map(|href| format!(r#"<a href="{}">{}</a> "#, href, href))
            .collect();
        format!(
            "<html><head><title>{}</title></head><body><h1>{}</h1><p>{}</p></body></html>",
            title, title, anchors
        )
    }
}

#[async_trait]
impl Renderer for FakeSite {
    async fn render(
        &self,
        url: &Url,
        _timeout: Duration,
        capture_screenshot: bool,
    ) -> Result<RenderResult, RenderError> {
        self.rendered.lock().unwrap().push(url.to_string());

        let key = format!("{}{}", url.host_str().unwrap_or_default(), url.path());
        let mut page = self
            .pages
            .get(&key)
            .cloned()
            .ok_or_else(|| RenderError::Network(format!("no route to {}", url)))?;

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        let mut final_url = url.clone();
        if let Some(target) = page.redirect_to.clone() {
            final_url = url.join(&target).unwrap();
            let target_key = format!("{}{}", final_url.host_str().unwrap_or_default(), final_url.path());
            page = self
                .pages
                .get(&target_key)
                .cloned()
                .ok_or_else(|| RenderError::Network(format!("no route to {}", final_url)))?;
        }

        Ok(RenderResult {
            status_code: page.status,
            html: Self::html_for(&page, final_url.path()),
            screenshot: capture_screenshot.then(|| FAKE_SCREENSHOT.to_vec()),
            final_url,
        })
    }
}

/// Configuration tuned for fast in-memory tests
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.scanner.workers = 2;
    config.scanner.job_timeout_secs = 30;
    config.crawler.max_concurrent_pages_open = 2;
    config.crawler.renderer_pool_size = 2;
    config.crawler.page_timeout_ms = 2_000;
    config.storage.database_path = ":memory:".to_string();
    config.lookup.enabled = false;
    config
}

/// A manager over an in-memory registry and the given renderer
pub fn create_test_manager(
    config: &Config,
    renderer: Arc<dyn Renderer>,
    lookup: Option<Arc<dyn DomainLookup>>,
) -> JobManager {
    let registry = Arc::new(SqliteJobRegistry::in_memory().unwrap());
    JobManager::new(config, registry, renderer, lookup)
}
