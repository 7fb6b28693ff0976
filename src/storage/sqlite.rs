//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobRegistry
//! trait. A single connection sits behind a mutex; each transition is one
//! guarded `UPDATE ... WHERE status = ?`, which makes it a compare-and-set.
//!
//! Several processes may share one database file. Unfinished Jobs hold a
//! lease (`lease_expires_at`) that the owning process renews; only Jobs whose
//! lease has lapsed are treated as abandoned.

use crate::analysis::ScoreReport;
use crate::artifacts::{ArtifactBundle, ArtifactKind};
use crate::jobs::{Job, JobId, JobSummary, ScanRequest};
use crate::state::{FailureReason, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobRegistry, StorageError, StorageResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Lease used until [`SqliteJobRegistry::with_lease`] says otherwise
pub const DEFAULT_LEASE: Duration = Duration::from_secs(30);

const JOB_COLUMNS: &str = "id, status, created_at, started_at, completed_at, request,
    pages_visited, max_pages, report, failure_reason, error_message, warnings,
    EXISTS(SELECT 1 FROM artifacts a WHERE a.job_id = jobs.id AND a.kind = 'screenshot'),
    EXISTS(SELECT 1 FROM artifacts a WHERE a.job_id = jobs.id AND a.kind = 'html_archive')";

/// SQLite Job registry
pub struct SqliteJobRegistry {
    conn: Mutex<Connection>,
    lease: Duration,
}

impl SqliteJobRegistry {
    /// Opens or creates a registry database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file (`:memory:` for a private
    ///   in-memory database)
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJobRegistry)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        // Other processes may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened job registry at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            lease: DEFAULT_LEASE,
        })
    }

    /// Creates an in-memory registry
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            lease: DEFAULT_LEASE,
        })
    }

    /// Sets the lease granted to Jobs owned through this registry
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    fn lease_deadline(&self) -> String {
        let now = Utc::now();
        let deadline = chrono::Duration::from_std(self.lease)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .unwrap_or(now);
        timestamp(deadline)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort as text
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp {:?}: {}", raw, e)))
}

fn parse_status(raw: &str) -> StorageResult<JobStatus> {
    JobStatus::from_db_string(raw)
        .ok_or_else(|| StorageError::Corrupt(format!("unknown job status {:?}", raw)))
}

fn parse_job_id(raw: &str) -> StorageResult<JobId> {
    raw.parse()
        .map_err(|_| StorageError::Corrupt(format!("bad job id {:?}", raw)))
}

/// Raw column values of one `jobs` row
struct JobRow {
    id: String,
    status: String,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    request: String,
    pages_visited: u32,
    max_pages: u32,
    report: Option<String>,
    failure_reason: Option<String>,
    error_message: Option<String>,
    warnings: String,
    has_screenshot: bool,
    has_html_archive: bool,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            created_at: row.get(2)?,
            started_at: row.get(3)?,
            completed_at: row.get(4)?,
            request: row.get(5)?,
            pages_visited: row.get(6)?,
            max_pages: row.get(7)?,
            report: row.get(8)?,
            failure_reason: row.get(9)?,
            error_message: row.get(10)?,
            warnings: row.get(11)?,
            has_screenshot: row.get(12)?,
            has_html_archive: row.get(13)?,
        })
    }

    fn into_job(self) -> StorageResult<Job> {
        let request: ScanRequest = serde_json::from_str(&self.request)?;
        let report: Option<ScoreReport> = self
            .report
            .as_deref()
            .map(serde_json::from_str::<ScoreReport>)
            .transpose()?;
        let failure_reason = match self.failure_reason.as_deref() {
            Some(raw) => Some(FailureReason::from_db_string(raw).ok_or_else(|| {
                StorageError::Corrupt(format!("unknown failure reason {:?}", raw))
            })?),
            None => None,
        };

        Ok(Job {
            id: parse_job_id(&self.id)?,
            status: parse_status(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
            started_at: self.started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            request,
            pages_visited: self.pages_visited,
            max_pages: self.max_pages,
            report,
            failure_reason,
            error_message: self.error_message,
            has_screenshot: self.has_screenshot,
            has_html_archive: self.has_html_archive,
            warnings: serde_json::from_str(&self.warnings)?,
        })
    }
}

impl JobRegistry for SqliteJobRegistry {
    // ===== Job Records =====

    fn insert(&self, job: &Job) -> StorageResult<()> {
        let request = serde_json::to_string(&job.request)?;
        let warnings = serde_json::to_string(&job.warnings)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO jobs (id, status, created_at, target_url, request, pages_visited, max_pages,
                 warnings, lease_expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                job.id.to_string(),
                job.status.to_db_string(),
                timestamp(job.created_at),
                job.request.url().as_str(),
                request,
                job.pages_visited,
                job.max_pages,
                warnings,
                self.lease_deadline(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: JobId) -> StorageResult<Option<Job>> {
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id.to_string()],
                JobRow::from_row,
            )
            .optional()?
        };

        row.map(JobRow::into_job).transpose()
    }

    fn list(&self) -> StorageResult<Vec<JobSummary>> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, status, target_url, created_at, pages_visited, max_pages, aggregate_score
                 FROM jobs ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, u32>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter()
            .map(
                |(id, status, url, created_at, pages_visited, max_pages, aggregate_score)| {
                    Ok(JobSummary {
                        id: parse_job_id(&id)?,
                        status: parse_status(&status)?,
                        url,
                        created_at: parse_timestamp(&created_at)?,
                        pages_visited,
                        max_pages,
                        aggregate_score,
                    })
                },
            )
            .collect()
    }

    fn delete(&self, id: JobId) -> StorageResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted == 1)
    }

    // ===== Transitions =====

    fn claim(&self, id: JobId) -> StorageResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE jobs SET status = ?1, started_at = ?2, lease_expires_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                JobStatus::InProgress.to_db_string(),
                timestamp(Utc::now()),
                self.lease_deadline(),
                id.to_string(),
                JobStatus::Pending.to_db_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn update_progress(&self, id: JobId, pages_visited: u32) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE jobs SET pages_visited = MAX(pages_visited, MIN(?1, max_pages))
             WHERE id = ?2 AND status = ?3",
            params![
                pages_visited,
                id.to_string(),
                JobStatus::InProgress.to_db_string(),
            ],
        )?;
        Ok(())
    }

    fn complete(
        &self,
        id: JobId,
        report: &ScoreReport,
        bundle: &ArtifactBundle,
    ) -> StorageResult<bool> {
        let report_json = serde_json::to_string(report)?;
        let warnings: Vec<String> = bundle.warnings.iter().map(|w| w.to_string()).collect();
        let warnings_json = serde_json::to_string(&warnings)?;
        let now = timestamp(Utc::now());
        let pages_crawled = u32::try_from(report.pages_crawled).unwrap_or(u32::MAX);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE jobs SET status = ?1, completed_at = ?2, report = ?3, aggregate_score = ?4,
                 warnings = ?5, pages_visited = MAX(pages_visited, MIN(?6, max_pages))
             WHERE id = ?7 AND status = ?8",
            params![
                JobStatus::Completed.to_db_string(),
                now,
                report_json,
                report.aggregate_score,
                warnings_json,
                pages_crawled,
                id.to_string(),
                JobStatus::InProgress.to_db_string(),
            ],
        )?;

        if changed == 0 {
            return Ok(false);
        }

        let artifacts = [
            (ArtifactKind::Screenshot, &bundle.screenshot),
            (ArtifactKind::HtmlArchive, &bundle.html_archive),
        ];
        for (kind, data) in artifacts {
            if let Some(bytes) = data {
                tx.execute(
                    "INSERT INTO artifacts (job_id, kind, data, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![id.to_string(), kind.to_db_string(), bytes, now],
                )?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn fail(&self, id: JobId, reason: FailureReason, message: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE jobs SET status = ?1, completed_at = ?2, failure_reason = ?3, error_message = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                JobStatus::Failed.to_db_string(),
                timestamp(Utc::now()),
                reason.to_db_string(),
                message,
                id.to_string(),
                JobStatus::InProgress.to_db_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    // ===== Ownership =====

    fn lease_duration(&self) -> Duration {
        self.lease
    }

    fn renew_lease(&self, id: JobId) -> StorageResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE jobs SET lease_expires_at = ?1 WHERE id = ?2 AND status IN (?3, ?4)",
            params![
                self.lease_deadline(),
                id.to_string(),
                JobStatus::Pending.to_db_string(),
                JobStatus::InProgress.to_db_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn fail_abandoned(&self) -> StorageResult<usize> {
        let now = timestamp(Utc::now());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE jobs SET status = ?1, started_at = ?2
             WHERE status = ?3 AND COALESCE(lease_expires_at, '') < ?2",
            params![
                JobStatus::InProgress.to_db_string(),
                now,
                JobStatus::Pending.to_db_string(),
            ],
        )?;

        let failed = tx.execute(
            "UPDATE jobs SET status = ?1, completed_at = ?2, failure_reason = ?3, error_message = ?4
             WHERE status = ?5 AND COALESCE(lease_expires_at, '') < ?2",
            params![
                JobStatus::Failed.to_db_string(),
                now,
                FailureReason::Internal.to_db_string(),
                "scan abandoned: its owning process stopped renewing the lease",
                JobStatus::InProgress.to_db_string(),
            ],
        )?;

        tx.commit()?;
        Ok(failed)
    }

    // ===== Artifacts =====

    fn load_artifact(&self, id: JobId, kind: ArtifactKind) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let data = conn
            .query_row(
                "SELECT data FROM artifacts WHERE job_id = ?1 AND kind = ?2",
                params![id.to_string(), kind.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }
}
