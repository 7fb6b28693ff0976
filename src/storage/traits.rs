//! Job registry trait and error types
//!
//! The registry is the only state shared between scan workers. Every status
//! write is a compare-and-set on the current status, so a Job is claimed by at
//! most one worker and reaches exactly one terminal state.

use crate::analysis::ScoreReport;
use crate::artifacts::{ArtifactBundle, ArtifactKind};
use crate::jobs::{Job, JobId, JobSummary};
use crate::state::FailureReason;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Registry lock poisoned")]
    LockPoisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared store of Job records and artifacts
///
/// Implementations must be safe to call from many workers at once. Methods
/// returning `bool` report whether the guarded write took effect; `false` is
/// the normal answer for a lost race, not an error.
pub trait JobRegistry: Send + Sync {
    // ===== Job Records =====

    /// Stores a new PENDING Job
    fn insert(&self, job: &Job) -> StorageResult<()>;

    /// Loads a Job, or `None` if the identifier is unknown
    fn get(&self, id: JobId) -> StorageResult<Option<Job>>;

    /// Summaries of every Job, oldest first
    fn list(&self) -> StorageResult<Vec<JobSummary>>;

    /// Removes a Job and its artifacts
    ///
    /// # Returns
    ///
    /// `true` if a Job was deleted
    fn delete(&self, id: JobId) -> StorageResult<bool>;

    // ===== Transitions =====

    /// Atomically moves a Job from PENDING to IN_PROGRESS
    ///
    /// # Returns
    ///
    /// * `true` - The caller now owns the Job
    /// * `false` - The Job is unknown, already claimed, or terminal
    fn claim(&self, id: JobId) -> StorageResult<bool>;

    /// Raises the visited-page counter of an IN_PROGRESS Job
    ///
    /// The counter never decreases and never exceeds the Job's max pages.
    fn update_progress(&self, id: JobId, pages_visited: u32) -> StorageResult<()>;

    /// Moves an IN_PROGRESS Job to COMPLETED, storing its report and artifacts
    fn complete(&self, id: JobId, report: &ScoreReport, bundle: &ArtifactBundle)
        -> StorageResult<bool>;

    /// Moves an IN_PROGRESS Job to FAILED with a reason
    fn fail(&self, id: JobId, reason: FailureReason, message: &str) -> StorageResult<bool>;

    // ===== Ownership =====

    /// Lease granted to a Job by `insert`, `claim` and `renew_lease`
    fn lease_duration(&self) -> Duration;

    /// Extends the lease of an unfinished Job
    ///
    /// # Returns
    ///
    /// `false` if the Job is unknown or already terminal
    fn renew_lease(&self, id: JobId) -> StorageResult<bool>;

    /// Fails every unfinished Job whose lease has run out
    ///
    /// Expired PENDING Jobs pass through IN_PROGRESS first, so each failure
    /// follows the normal state machine. Jobs with a live lease are left
    /// alone, whichever process owns them.
    ///
    /// # Returns
    ///
    /// The number of Jobs failed
    fn fail_abandoned(&self) -> StorageResult<usize>;

    // ===== Artifacts =====

    /// Loads one artifact of a Job
    fn load_artifact(&self, id: JobId, kind: ArtifactKind) -> StorageResult<Option<Vec<u8>>>;
}
