//! Scan worker - runs one claimed Job to a terminal state
//!
//! The pipeline for a Job:
//! - Claiming the Job (PENDING -> IN_PROGRESS); losing the race is a no-op
//! - Crawling under the Job-level wall-clock ceiling, publishing progress
//! - Scoring and packaging artifacts on the blocking pool
//! - Attaching domain metadata, which never fails the Job
//! - Recording COMPLETED or FAILED exactly once
//!
//! Partial page sets are discarded when a Job is cancelled or times out; a
//! failed Job stores no report and no artifacts.

use crate::analysis::{ScoreReport, ScoringEngine};
use crate::artifacts::{ArtifactBuilder, ArtifactBundle};
use crate::config::Config;
use crate::crawler::{CancelFlag, CrawlEngine, CrawlError, CrawlSettings, PageFetcher};
use crate::jobs::{JobId, ScanRequest};
use crate::lookup::{lookup_or_empty, DomainInfo, DomainLookup};
use crate::render::RendererPool;
use crate::state::FailureReason;
use crate::storage::JobRegistry;
use crate::url::extract_domain;
use std::sync::Arc;
use std::time::Duration;

/// Why a claimed Job is about to fail
#[derive(Debug, Clone, PartialEq, Eq)]
struct JobFailure {
    reason: FailureReason,
    message: String,
}

impl From<CrawlError> for JobFailure {
    fn from(err: CrawlError) -> Self {
        let reason = match err {
            CrawlError::StartUrlUnreachable(_) => FailureReason::StartUrlUnreachable,
            CrawlError::Cancelled => FailureReason::Cancelled,
        };
        Self {
            reason,
            message: err.to_string(),
        }
    }
}

/// Everything a worker needs to execute Jobs
///
/// Shared by all workers; holds no per-Job state.
pub(crate) struct ScanWorker {
    registry: Arc<dyn JobRegistry>,
    pool: RendererPool,
    scoring: ScoringEngine,
    lookup: Option<Arc<dyn DomainLookup>>,
    lookup_timeout: Duration,
    job_timeout: Duration,
    concurrency: u32,
    allowed_domains: Vec<String>,
    screenshots_enabled: bool,
    html_archive_enabled: bool,
}

impl ScanWorker {
    pub(crate) fn new(
        config: &Config,
        registry: Arc<dyn JobRegistry>,
        pool: RendererPool,
        lookup: Option<Arc<dyn DomainLookup>>,
    ) -> Self {
        Self {
            registry,
            pool,
            scoring: ScoringEngine::new(config.scoring.clone()),
            lookup,
            lookup_timeout: Duration::from_millis(config.lookup.timeout_ms),
            job_timeout: Duration::from_secs(config.scanner.job_timeout_secs),
            concurrency: config.crawler.max_concurrent_pages_open,
            allowed_domains: config.crawler.allowed_domains.clone(),
            screenshots_enabled: config.artifacts.screenshots,
            html_archive_enabled: config.artifacts.html_archive,
        }
    }

    /// Claims and runs a Job until it is COMPLETED or FAILED
    ///
    /// Storage errors here have no caller to report to, so they are logged.
    pub(crate) async fn run(&self, id: JobId, request: ScanRequest, cancel: CancelFlag) {
        match self.registry.claim(id) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Job {} was not pending, skipping", id);
                return;
            }
            Err(e) => {
                tracing::error!("Failed to claim job {}: {}", id, e);
                return;
            }
        }

        tracing::info!("Job {} in progress: {}", id, request.url());

        let outcome = tokio::time::timeout(self.job_timeout, self.execute(id, &request, &cancel))
            .await
            .unwrap_or_else(|_| {
                Err(JobFailure {
                    reason: FailureReason::Timeout,
                    message: format!(
                        "scan exceeded the {}s time limit",
                        self.job_timeout.as_secs()
                    ),
                })
            });

        let recorded = match outcome {
            Ok((report, bundle)) => {
                tracing::info!(
                    "Job {} completed: {} pages, aggregate score {}",
                    id,
                    report.pages_crawled,
                    report.aggregate_score
                );
                self.registry.complete(id, &report, &bundle)
            }
            Err(failure) => {
                tracing::warn!("Job {} failed ({}): {}", id, failure.reason, failure.message);
                self.registry.fail(id, failure.reason, &failure.message)
            }
        };

        match recorded {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Job {} left IN_PROGRESS before its result was stored", id),
            Err(e) => tracing::error!("Failed to record result of job {}: {}", id, e),
        }
    }

    async fn execute(
        &self,
        id: JobId,
        request: &ScanRequest,
        cancel: &CancelFlag,
    ) -> Result<(ScoreReport, ArtifactBundle), JobFailure> {
        let engine = CrawlEngine::new(PageFetcher::new(self.pool.clone(), request.page_timeout()));
        let capture_screenshot = request.include_screenshot() && self.screenshots_enabled;
        let include_html = request.include_html() && self.html_archive_enabled;

        let settings = CrawlSettings {
            max_pages: request.max_pages(),
            concurrency: self.concurrency,
            capture_screenshot,
            allowed_domains: self.allowed_domains.clone(),
        };

        let registry = Arc::clone(&self.registry);
        let output = engine
            .crawl(request.url().clone(), &settings, cancel, move |visited| {
                if let Err(e) = registry.update_progress(id, visited) {
                    tracing::warn!("Failed to publish progress for job {}: {}", id, e);
                }
            })
            .await?;

        let scoring = self.scoring.clone();
        let builder = ArtifactBuilder::new(include_html, capture_screenshot);
        let pages = output.pages;
        let screenshot = output.screenshot;

        let (mut report, bundle) = tokio::task::spawn_blocking(move || {
            let report = scoring.score(&pages);
            let bundle = builder.build(&pages, screenshot);
            (report, bundle)
        })
        .await
        .map_err(|e| JobFailure {
            reason: FailureReason::Internal,
            message: format!("scoring task failed: {}", e),
        })?;

        report.domain = self.lookup_domain(request).await;

        Ok((report, bundle))
    }

    async fn lookup_domain(&self, request: &ScanRequest) -> Option<DomainInfo> {
        let lookup = self.lookup.as_ref()?;
        let domain = extract_domain(request.url())?;
        Some(lookup_or_empty(lookup.as_ref(), &domain, self.lookup_timeout).await)
    }
}
