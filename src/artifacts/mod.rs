//! Artifact production
//!
//! Packages a finished crawl into its durable byproducts:
//! - A zip archive with one HTML entry per successfully fetched page
//! - The start page screenshot, passed through as captured
//!
//! A missing artifact is a warning on the bundle, never a Job failure.

mod archive;

pub use archive::{archive_entry_name, build_html_archive, read_html_archive, ArchivedPage};

use crate::crawler::PageRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an artifact could not be produced
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("no successfully fetched pages to archive")]
    NoPages,

    #[error("failed to build HTML archive: {0}")]
    Archive(String),

    #[error("screenshot requested but the renderer did not produce one")]
    ScreenshotUnavailable,

    #[error("stored HTML archive is unreadable: {0}")]
    Unreadable(String),
}

/// Artifact kinds stored per Job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Screenshot,
    HtmlArchive,
}

impl ArtifactKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::HtmlArchive => "html_archive",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "screenshot" => Some(Self::Screenshot),
            "html_archive" => Some(Self::HtmlArchive),
            _ => None,
        }
    }
}

/// Artifacts produced for one Job
#[derive(Debug, Clone, Default)]
pub struct ArtifactBundle {
    pub screenshot: Option<Vec<u8>>,
    pub html_archive: Option<Vec<u8>>,

    /// Requested artifacts that could not be produced
    pub warnings: Vec<ArtifactError>,
}

/// Builds the artifact bundle for a crawl
#[derive(Debug, Clone, Copy)]
pub struct ArtifactBuilder {
    include_html: bool,
    include_screenshot: bool,
}

impl ArtifactBuilder {
    /// # Arguments
    ///
    /// * `include_html` - Produce the HTML archive
    /// * `include_screenshot` - Keep the start page screenshot
    pub fn new(include_html: bool, include_screenshot: bool) -> Self {
        Self {
            include_html,
            include_screenshot,
        }
    }

    /// Builds the bundle
    ///
    /// Unrequested artifacts are left out silently; requested ones that cannot
    /// be produced add a warning.
    pub fn build(&self, pages: &[PageRecord], screenshot: Option<Vec<u8>>) -> ArtifactBundle {
        let mut bundle = ArtifactBundle::default();

        if self.include_screenshot {
            match screenshot {
                Some(bytes) if !bytes.is_empty() => bundle.screenshot = Some(bytes),
                _ => bundle.warnings.push(ArtifactError::ScreenshotUnavailable),
            }
        }

        if self.include_html {
            match build_html_archive(pages) {
                Ok(bytes) => bundle.html_archive = Some(bytes),
                Err(e) => {
                    tracing::warn!("HTML archive not produced: {}", e);
                    bundle.warnings.push(e);
                }
            }
        }

        bundle
    }
}
