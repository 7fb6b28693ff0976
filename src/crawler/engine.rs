//! Crawl engine - bounded breadth-first traversal
//!
//! This module drives one crawl from a start URL:
//! - Popping FIFO batches of at most `concurrency` URLs from the frontier
//! - Fetching each batch concurrently while keeping results in dispatch order
//! - Filtering discovered links through the link scope and the frontier
//! - Enforcing the page budget and observing cooperative cancellation
//!
//! Page records come back in BFS discovery order, never completion order, so
//! dedup decisions and visitation are deterministic for a given site graph.

use crate::crawler::fetcher::{PageFetcher, PageRecord};
use crate::crawler::frontier::Frontier;
use crate::url::{same_origin, LinkScope};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Crawl-level failures; per-page failures never surface here
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrawlError {
    #[error("start URL unreachable: {0}")]
    StartUrlUnreachable(String),

    #[error("crawl cancelled")]
    Cancelled,
}

/// Shared cooperative cancellation flag
///
/// Cloning shares the flag. The crawl engine checks it at every frontier pop
/// and before every fetch dispatch; in-flight fetches are left to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-crawl limits
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Page budget; the crawl never records more pages than this
    pub max_pages: u32,

    /// Maximum fetches in flight at once
    pub concurrency: u32,

    /// Capture a screenshot while rendering the start URL
    pub capture_screenshot: bool,

    /// Off-origin domain patterns that may still be followed
    pub allowed_domains: Vec<String>,
}

/// Result of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    /// Page records in BFS visitation order
    pub pages: Vec<PageRecord>,

    /// Start-page screenshot, if one was requested and produced
    pub screenshot: Option<Vec<u8>>,

    /// Frontier URLs left unvisited when the budget ran out
    pub unvisited: Vec<Url>,
}

/// Drives bounded breadth-first crawls
#[derive(Clone)]
pub struct CrawlEngine {
    fetcher: PageFetcher,
}

impl CrawlEngine {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Runs a crawl from `start`
    ///
    /// # Crawl Loop
    ///
    /// 1. Stop with `Cancelled` if the flag is set
    /// 2. Stop if the budget is used up or the frontier is empty
    /// 3. Pop a batch of `min(concurrency, remaining budget)` URLs
    /// 4. Fetch the batch concurrently, results buffered in dispatch order
    /// 5. For each record: mark its final URL visited, offer in-scope links
    ///    to the frontier, append the record. When the start URL redirects
    ///    off its origin, the scope is rebuilt around the redirect target.
    ///
    /// # Arguments
    ///
    /// * `start` - Canonical start URL
    /// * `settings` - Budget, concurrency and scope
    /// * `cancel` - Cooperative cancellation flag
    /// * `on_progress` - Called with the running page count after every completed fetch
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutput)` - Crawl finished; individual pages may have failed
    /// * `Err(CrawlError::StartUrlUnreachable)` - The start URL could not be fetched
    /// * `Err(CrawlError::Cancelled)` - The cancel flag was observed
    pub async fn crawl<F>(
        &self,
        start: Url,
        settings: &CrawlSettings,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> Result<CrawlOutput, CrawlError>
    where
        F: Fn(u32) + Send + Sync,
    {
        let mut scope = LinkScope::new(start.clone(), settings.allowed_domains.clone());
        let mut frontier = Frontier::new(start.clone());
        let mut pages: Vec<PageRecord> = Vec::new();
        let mut screenshot = None;

        let max_pages = settings.max_pages.max(1) as usize;
        let concurrency = settings.concurrency.max(1) as usize;
        let completed = AtomicU32::new(0);

        tracing::info!(
            "Starting crawl of {} (max {} pages, concurrency {})",
            start,
            max_pages,
            concurrency
        );

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Crawl of {} cancelled after {} pages", start, pages.len());
                return Err(CrawlError::Cancelled);
            }

            let remaining = max_pages - pages.len();
            if remaining == 0 {
                break;
            }

            if frontier.is_empty() {
                break;
            }
            let batch = frontier.pop_batch(concurrency.min(remaining));

            let first_batch = pages.is_empty();
            let outcomes = stream::iter(batch)
                .map(|url| {
                    let capture =
                        settings.capture_screenshot && first_batch && url == start;
                    let completed = &completed;
                    let on_progress = &on_progress;
                    async move {
                        if cancel.is_cancelled() {
                            return None;
                        }
                        let outcome = self.fetcher.fetch(url, capture).await;
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        on_progress(done);
                        Some(outcome)
                    }
                })
                .buffered(concurrency)
                .collect::<Vec<_>>()
                .await;

            for outcome in outcomes {
                let Some(outcome) = outcome else {
                    // Dispatch was skipped because the flag flipped mid-batch
                    return Err(CrawlError::Cancelled);
                };

                let record = outcome.record;

                if first_batch && record.url == start {
                    if let Some(error) = &record.error {
                        tracing::warn!("Start URL {} unreachable: {}", start, error);
                        return Err(CrawlError::StartUrlUnreachable(error.to_string()));
                    }
                    screenshot = outcome.screenshot;

                    // Links resolve against the redirect target, so scope follows it too
                    if !same_origin(&record.final_url, &start) {
                        tracing::info!(
                            "Start URL {} redirected to {}, rescoping crawl",
                            start,
                            record.final_url
                        );
                        scope = LinkScope::new(
                            record.final_url.clone(),
                            settings.allowed_domains.clone(),
                        );
                    }
                }

                frontier.mark_visited(&record.final_url);

                let mut queued = 0;
                for link in &record.links {
                    if scope.allows(link) && frontier.offer(link.clone()) {
                        queued += 1;
                    }
                }

                tracing::debug!(
                    "Visited {} (status {:?}), queued {} new links, {} waiting",
                    record.url,
                    record.status_code,
                    queued,
                    frontier.len()
                );

                pages.push(record);
            }
        }

        let unvisited = frontier.into_remaining();

        tracing::info!(
            "Crawl of {} finished: {} pages visited, {} left in frontier",
            start,
            pages.len(),
            unvisited.len()
        );

        Ok(CrawlOutput {
            pages,
            screenshot,
            unvisited,
        })
    }
}
