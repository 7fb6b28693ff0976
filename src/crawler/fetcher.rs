//! Page fetcher
//!
//! This module turns one render into one `PageRecord`:
//! - Leasing a renderer from the shared pool
//! - Enforcing the hard per-page timeout
//! - Measuring fetch latency and payload size
//! - Classifying every failure into a `FetchError` recorded on the page

use crate::crawler::parser::extract_links;
use crate::render::{RenderError, RendererPool};
use crate::url::canonicalize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Per-page fetch failures
///
/// These are recorded on the page and never abort the crawl on their own.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("non-HTML content ({0})")]
    NonHtml(String),
}

impl From<RenderError> for FetchError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Timeout => FetchError::Timeout,
            RenderError::Network(msg) => FetchError::Network(msg),
            RenderError::NonHtml { content_type } => FetchError::NonHtml(content_type),
            RenderError::Engine(msg) => FetchError::Network(format!("rendering engine: {}", msg)),
        }
    }
}

/// Everything known about one visited page
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Canonical requested URL, unique within a crawl
    pub url: Url,

    /// URL after redirects; base for link resolution
    pub final_url: Url,

    /// HTTP status, when a response was received
    pub status_code: Option<u16>,

    /// Rendered HTML, None on any fetch failure
    pub html: Option<String>,

    /// Canonical outbound links, sorted and deduplicated
    pub links: Vec<Url>,

    /// Time spent rendering (milliseconds)
    pub latency_ms: u64,

    /// Size of the HTML payload in bytes
    pub content_length: u64,

    /// Why the fetch failed, if it did
    pub error: Option<FetchError>,
}

impl PageRecord {
    /// Returns true if the page was fetched with usable HTML
    pub fn is_success(&self) -> bool {
        self.html.is_some() && self.error.is_none()
    }

    fn failed(url: Url, status_code: Option<u16>, latency_ms: u64, error: FetchError) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status_code,
            html: None,
            links: Vec::new(),
            latency_ms,
            content_length: 0,
            error: Some(error),
        }
    }
}

/// Result of a single fetch
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub record: PageRecord,

    /// Present only when a screenshot was requested and the renderer produced one
    pub screenshot: Option<Vec<u8>>,
}

/// Fetches single pages through the renderer pool
#[derive(Clone)]
pub struct PageFetcher {
    pool: RendererPool,
    timeout: Duration,
}

impl PageFetcher {
    /// Creates a fetcher with the given hard per-page timeout
    pub fn new(pool: RendererPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Fetches one page
    ///
    /// # Fetch Flow
    ///
    /// 1. Lease a renderer from the pool (waits while the pool is full)
    /// 2. Render under a hard timeout; the lease is returned on every path
    /// 3. Classify the outcome:
    ///    - Render failure → `FetchError` from the render error
    ///    - Non-2xx status → `FetchError::Status`
    ///    - Otherwise → HTML kept, links extracted against the final URL
    ///
    /// Never fails: every problem ends up on the returned record.
    pub async fn fetch(&self, url: Url, capture_screenshot: bool) -> FetchOutcome {
        if self.pool.available() == 0 {
            tracing::trace!("Renderer pool full, {} waits for a slot", url);
        }

        let lease = match self.pool.acquire().await {
            Some(lease) => lease,
            None => {
                return FetchOutcome {
                    record: PageRecord::failed(
                        url,
                        None,
                        0,
                        FetchError::Network("renderer pool closed".to_string()),
                    ),
                    screenshot: None,
                };
            }
        };

        let started = Instant::now();
        let rendered = tokio::time::timeout(
            self.timeout,
            lease.render(&url, self.timeout, capture_screenshot),
        )
        .await;
        drop(lease);
        let latency_ms = started.elapsed().as_millis() as u64;

        let result = match rendered {
            Err(_) => Err(FetchError::Timeout),
            Ok(Err(e)) => Err(FetchError::from(e)),
            Ok(Ok(result)) => Ok(result),
        };

        let result = match result {
            Ok(result) => result,
            Err(error) => {
                tracing::debug!("Fetch failed for {}: {}", url, error);
                return FetchOutcome {
                    record: PageRecord::failed(url, None, latency_ms, error),
                    screenshot: None,
                };
            }
        };

        if !(200..300).contains(&result.status_code) {
            tracing::debug!("Fetch of {} returned status {}", url, result.status_code);
            let final_url = canonicalize(result.final_url).unwrap_or_else(|_| url.clone());
            let mut record = PageRecord::failed(
                url,
                Some(result.status_code),
                latency_ms,
                FetchError::Status(result.status_code),
            );
            record.final_url = final_url;
            return FetchOutcome {
                record,
                screenshot: None,
            };
        }

        let final_url = canonicalize(result.final_url).unwrap_or_else(|_| url.clone());
        let links = extract_links(&result.html, &final_url);
        let content_length = result.html.len() as u64;

        tracing::debug!(
            "Fetched {} ({} bytes, {} links, {}ms)",
            url,
            content_length,
            links.len(),
            latency_ms
        );

        FetchOutcome {
            record: PageRecord {
                url,
                final_url,
                status_code: Some(result.status_code),
                html: Some(result.html),
                links,
                latency_ms,
                content_length,
                error: None,
            },
            screenshot: result.screenshot,
        }
    }
}
