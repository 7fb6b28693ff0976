//! Output module for scan reports and artifact files
//!
//! This module handles:
//! - Rendering a Job as a markdown report
//! - Exporting a Job as JSON
//! - Writing a finished scan's report and artifacts to a directory

mod json;
mod markdown;

pub use json::{format_json_report, write_json_report};
pub use markdown::{format_markdown_report, write_markdown_report};

use crate::jobs::{Job, JobManager};
use crate::ScanError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Failed to load scan data: {0}")]
    Scan(#[from] ScanError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes every output of a Job into `dir`
///
/// Produces `scan_<id>.json` and `scan_<id>.md`, plus
/// `scan_<id>_html.zip` and `scan_<id>_screenshot.png` when the Job has those
/// artifacts.
///
/// # Returns
///
/// The paths written, in that order
pub fn export_scan(manager: &JobManager, job: &Job, dir: &Path) -> OutputResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let json_path = dir.join(format!("scan_{}.json", job.id));
    write_json_report(job, &json_path)?;
    written.push(json_path);

    let md_path = dir.join(format!("scan_{}.md", job.id));
    write_markdown_report(job, &md_path)?;
    written.push(md_path);

    if job.has_html_archive {
        let path = dir.join(format!("scan_{}_html.zip", job.id));
        write_artifact(manager.fetch_html_archive(job.id), &path, &mut written)?;
    }

    if job.has_screenshot {
        let path = dir.join(format!("scan_{}_screenshot.png", job.id));
        write_artifact(manager.fetch_screenshot(job.id), &path, &mut written)?;
    }

    Ok(written)
}

fn write_artifact(
    bytes: Result<Vec<u8>, ScanError>,
    path: &Path,
    written: &mut Vec<PathBuf>,
) -> OutputResult<()> {
    match bytes {
        Ok(bytes) => {
            std::fs::write(path, bytes)?;
            written.push(path.to_path_buf());
            Ok(())
        }
        // Deleted between the status read and the download
        Err(ScanError::NotFound(id)) => {
            tracing::warn!("Artifact for job {} disappeared before export", id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
