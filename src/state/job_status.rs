/// Job status definitions for the scan lifecycle
///
/// A Job moves `Pending -> InProgress -> {Completed, Failed}` and never leaves
/// a terminal state.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the lifecycle status of a scan Job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and recorded, not yet claimed by a worker
    Pending,

    /// Claimed by exactly one worker
    InProgress,

    // ===== Terminal States =====
    /// Finished with a report attached
    Completed,

    /// Finished without a report; a failure reason is recorded
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
