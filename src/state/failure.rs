use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a Job ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The start URL could not be fetched
    StartUrlUnreachable,

    /// A caller cancelled the Job
    Cancelled,

    /// The Job-level wall-clock ceiling was exceeded
    Timeout,

    /// Anything else: registry errors, a panicked worker task
    Internal,
}

impl FailureReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::StartUrlUnreachable => "start_url_unreachable",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "start_url_unreachable" => Some(Self::StartUrlUnreachable),
            "cancelled" => Some(Self::Cancelled),
            "timeout" => Some(Self::Timeout),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
