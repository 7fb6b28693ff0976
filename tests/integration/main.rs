//! Integration tests for Site Scanner

mod common;
mod crawl_tests;
mod job_tests;
mod recovery_tests;
mod scan_tests;
