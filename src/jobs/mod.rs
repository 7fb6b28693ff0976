//! Scan Jobs
//!
//! - `request`: Validation of caller input into a `ScanRequest`
//! - `model`: Job records and listing summaries
//! - `manager`: Submission, queries, cancellation and artifact downloads
//! - `worker`: Executes one claimed Job through crawl, scoring and artifacts

mod manager;
mod model;
mod request;
mod worker;

pub use manager::JobManager;
pub use model::{Job, JobId, JobSummary};
pub use request::{RawScanRequest, ScanRequest, ValidationError};
