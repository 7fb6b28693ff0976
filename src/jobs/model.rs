use crate::analysis::ScoreReport;
use crate::jobs::request::ScanRequest;
use crate::state::{FailureReason, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique Job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One scan and everything known about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub request: ScanRequest,

    /// Pages fetched so far; informational, never above `max_pages`
    pub pages_visited: u32,
    pub max_pages: u32,

    /// Present once the Job is COMPLETED
    pub report: Option<ScoreReport>,

    pub failure_reason: Option<FailureReason>,
    pub error_message: Option<String>,

    pub has_screenshot: bool,
    pub has_html_archive: bool,

    /// Requested artifacts that could not be produced
    pub warnings: Vec<String>,
}

impl Job {
    /// A fresh PENDING Job for an accepted request
    pub fn new(id: JobId, request: ScanRequest) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            max_pages: request.max_pages(),
            request,
            pages_visited: 0,
            report: None,
            failure_reason: None,
            error_message: None,
            has_screenshot: false,
            has_html_archive: false,
            warnings: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Completed, but some requested artifact is missing
    pub fn is_partial_success(&self) -> bool {
        self.status == JobStatus::Completed && !self.warnings.is_empty()
    }
}

/// Row of the Job listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub pages_visited: u32,
    pub max_pages: u32,
    pub aggregate_score: Option<f64>,
}
