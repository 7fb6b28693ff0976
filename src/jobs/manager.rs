//! Job manager - the public face of the scanner
//!
//! Accepts scan requests, hands them to a bounded pool of worker slots, and
//! answers status, listing, cancellation and artifact queries from the Job
//! registry.

use crate::artifacts::{read_html_archive, ArchivedPage, ArtifactKind};
use crate::config::{Config, CrawlerConfig};
use crate::crawler::CancelFlag;
use crate::jobs::worker::ScanWorker;
use crate::jobs::{Job, JobId, JobSummary, RawScanRequest, ScanRequest};
use crate::lookup::{DnsLookup, DomainLookup};
use crate::render::{build_renderer, Renderer, RendererPool};
use crate::state::JobStatus;
use crate::storage::{JobRegistry, SqliteJobRegistry};
use crate::ScanError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Submits and tracks scan Jobs
///
/// Cloning is cheap and every clone drives the same registry and worker pool.
/// Submitting requires a running Tokio runtime.
#[derive(Clone)]
pub struct JobManager {
    registry: Arc<dyn JobRegistry>,
    worker: Arc<ScanWorker>,
    slots: Arc<Semaphore>,
    cancel_flags: Arc<Mutex<HashMap<JobId, CancelFlag>>>,
    limits: CrawlerConfig,
}

impl JobManager {
    /// Creates a manager from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `registry` - Shared Job registry
    /// * `renderer` - Rendering capability, pooled at `renderer-pool-size`
    /// * `lookup` - Domain metadata source, or `None` to skip lookups
    pub fn new(
        config: &Config,
        registry: Arc<dyn JobRegistry>,
        renderer: Arc<dyn Renderer>,
        lookup: Option<Arc<dyn DomainLookup>>,
    ) -> Self {
        let pool = RendererPool::new(renderer, config.crawler.renderer_pool_size as usize);
        let worker = ScanWorker::new(config, Arc::clone(&registry), pool, lookup);

        Self {
            registry,
            worker: Arc::new(worker),
            slots: Arc::new(Semaphore::new(config.scanner.workers.max(1) as usize)),
            cancel_flags: Arc::new(Mutex::new(HashMap::new())),
            limits: config.crawler.clone(),
        }
    }

    /// Creates a manager with the SQLite registry, renderer and DNS lookup
    /// described by `config`
    ///
    /// Unfinished Jobs whose lease has lapsed are failed on startup. Jobs
    /// another live process is still renewing are left alone.
    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let registry = SqliteJobRegistry::open(Path::new(&config.storage.database_path))?
            .with_lease(Duration::from_secs(config.scanner.lease_secs));
        let abandoned = registry.fail_abandoned()?;
        if abandoned > 0 {
            tracing::warn!("Marked {} abandoned jobs as failed", abandoned);
        }

        let renderer = build_renderer(config)?;
        let lookup: Option<Arc<dyn DomainLookup>> = if config.lookup.enabled {
            Some(Arc::new(DnsLookup))
        } else {
            None
        };

        Ok(Self::new(
            config,
            Arc::new(registry),
            renderer,
            lookup,
        ))
    }

    /// Validates raw input and submits it
    ///
    /// # Returns
    ///
    /// * `Ok(JobId)` - The Job exists and is PENDING
    /// * `Err(ScanError::Validation)` - The request was rejected; no Job exists
    pub fn submit_raw(&self, raw: RawScanRequest) -> Result<JobId, ScanError> {
        let request = ScanRequest::from_raw(raw, &self.limits)?;
        self.submit(request)
    }

    /// Records a PENDING Job and schedules it on the worker pool
    pub fn submit(&self, request: ScanRequest) -> Result<JobId, ScanError> {
        let id = JobId::new();
        let job = Job::new(id, request.clone());
        self.registry.insert(&job)?;

        let cancel = CancelFlag::new();
        self.flags().insert(id, cancel.clone());

        tracing::info!(
            "Job {} submitted: {} (max {} pages)",
            id,
            request.url(),
            request.max_pages()
        );

        let manager = self.clone();
        tokio::spawn(async move {
            let work = async {
                match Arc::clone(&manager.slots).acquire_owned().await {
                    Ok(_permit) => manager.worker.run(id, request, cancel).await,
                    Err(_) => tracing::error!("Worker pool closed before job {} started", id),
                }
            };

            tokio::select! {
                _ = work => {}
                _ = manager.keep_alive(id) => {}
            }
            manager.flags().remove(&id);
        });

        Ok(id)
    }

    /// Current state of a Job
    pub fn get_job(&self, id: JobId) -> Result<Job, ScanError> {
        self.registry.get(id)?.ok_or(ScanError::NotFound(id))
    }

    /// Summaries of every Job, oldest first
    pub fn list_jobs(&self) -> Result<Vec<JobSummary>, ScanError> {
        Ok(self.registry.list()?)
    }

    /// Deletes a Job and its artifacts
    ///
    /// A running Job is cancelled first; its worker then finds nothing to
    /// update.
    pub fn delete_job(&self, id: JobId) -> Result<(), ScanError> {
        if let Some(flag) = self.flags().get(&id) {
            flag.cancel();
        }

        if self.registry.delete(id)? {
            tracing::info!("Job {} deleted", id);
            Ok(())
        } else {
            Err(ScanError::NotFound(id))
        }
    }

    /// Requests cooperative cancellation
    ///
    /// The crawl notices at its next frontier pop or fetch dispatch and the
    /// Job ends FAILED with reason `cancelled`. Cancelling a finished Job does
    /// nothing.
    pub fn cancel(&self, id: JobId) -> Result<(), ScanError> {
        let job = self.get_job(id)?;
        if job.is_terminal() {
            tracing::debug!("Job {} already {}, nothing to cancel", id, job.status);
            return Ok(());
        }

        if let Some(flag) = self.flags().get(&id) {
            flag.cancel();
            tracing::info!("Cancellation requested for job {}", id);
        }
        Ok(())
    }

    /// Homepage screenshot of a completed Job
    pub fn fetch_screenshot(&self, id: JobId) -> Result<Vec<u8>, ScanError> {
        self.fetch_artifact(id, ArtifactKind::Screenshot)
    }

    /// Zip archive of the fetched HTML of a completed Job
    pub fn fetch_html_archive(&self, id: JobId) -> Result<Vec<u8>, ScanError> {
        self.fetch_artifact(id, ArtifactKind::HtmlArchive)
    }

    /// HTML of every archived page of a completed Job, in crawl order
    ///
    /// Pages that failed to fetch have no archived HTML and are left out.
    pub fn fetch_html_content(&self, id: JobId) -> Result<Vec<ArchivedPage>, ScanError> {
        let archive = self.fetch_html_archive(id)?;
        let job = self.get_job(id)?;

        let urls: Vec<Url> = job
            .report
            .iter()
            .flat_map(|report| &report.pages)
            .filter(|page| page.error.is_none())
            .filter_map(|page| Url::parse(&page.url).ok())
            .collect();

        Ok(read_html_archive(&archive, &urls)?)
    }

    fn fetch_artifact(&self, id: JobId, kind: ArtifactKind) -> Result<Vec<u8>, ScanError> {
        let job = self.get_job(id)?;
        match job.status {
            JobStatus::Pending | JobStatus::InProgress => Err(ScanError::NotReady {
                id,
                status: job.status,
            }),
            JobStatus::Failed => Err(ScanError::NotFound(id)),
            JobStatus::Completed => self
                .registry
                .load_artifact(id, kind)?
                .ok_or(ScanError::NotFound(id)),
        }
    }

    /// Polls until a Job reaches a terminal state
    ///
    /// # Arguments
    ///
    /// * `id` - The Job to watch
    /// * `interval` - Delay between polls
    /// * `on_poll` - Called with every non-terminal snapshot
    pub async fn wait_for_terminal<F>(
        &self,
        id: JobId,
        interval: Duration,
        mut on_poll: F,
    ) -> Result<Job, ScanError>
    where
        F: FnMut(&Job),
    {
        loop {
            let job = self.get_job(id)?;
            if job.is_terminal() {
                return Ok(job);
            }
            on_poll(&job);
            tokio::time::sleep(interval).await;
        }
    }

    /// Renews the Job's lease until the surrounding task drops this future
    async fn keep_alive(&self, id: JobId) {
        let period = (self.registry.lease_duration() / 3).max(Duration::from_millis(10));
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; insert already granted a lease
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = self.registry.renew_lease(id) {
                tracing::warn!("Failed to renew lease of job {}: {}", id, e);
            }
        }
    }

    fn flags(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, CancelFlag>> {
        self.cancel_flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
