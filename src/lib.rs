//! Site Scanner: bounded crawl-and-score website analysis
//!
//! This crate traverses a bounded subset of a target website, extracts content
//! and structural signals from every fetched page, and produces a composite
//! quality score together with durable artifacts (a homepage screenshot and a
//! zip archive of the fetched HTML). Scans run asynchronously as Jobs whose
//! lifecycle is tracked in a shared registry.

pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod lookup;
pub mod output;
pub mod render;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site Scanner operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid scan request: {0}")]
    Validation(#[from] jobs::ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Scan not found: {0}")]
    NotFound(jobs::JobId),

    #[error("Scan {id} is not finished yet (status: {status})")]
    NotReady {
        id: jobs::JobId,
        status: state::JobStatus,
    },

    #[error("Artifact error: {0}")]
    Artifact(#[from] artifacts::ArtifactError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

// Re-export commonly used types
pub use analysis::{ScoreReport, ScoringEngine};
pub use config::Config;
pub use jobs::{Job, JobId, JobManager, ScanRequest};
pub use state::JobStatus;
pub use url::{canonicalize_url, dedup_key};
