//! Crawler module for bounded site traversal
//!
//! This module contains the core crawling logic, including:
//! - Page fetching through the shared renderer pool
//! - HTML link extraction
//! - The per-crawl frontier
//! - Breadth-first crawl coordination

mod engine;
mod fetcher;
mod frontier;
mod parser;

pub use engine::{CancelFlag, CrawlEngine, CrawlError, CrawlOutput, CrawlSettings};
pub use fetcher::{FetchError, FetchOutcome, PageFetcher, PageRecord};
pub use frontier::Frontier;
pub use parser::{extract_links, extract_links_from_document, resolve_link};
