//! State module for tracking the scan lifecycle
//!
//! # Components
//!
//! - `JobStatus`: The Job state machine (pending, in progress, completed, failed)
//! - `FailureReason`: Machine-readable cause recorded on failed Jobs

mod failure;
mod job_status;

// Re-export main types
pub use failure::FailureReason;
pub use job_status::JobStatus;
