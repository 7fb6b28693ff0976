//! Scan request validation
//!
//! Raw caller input is turned into a [`ScanRequest`] by a single pure
//! function. A request that fails validation never becomes a Job.

use crate::config::CrawlerConfig;
use crate::url::canonicalize_url;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Bounds accepted for a per-page timeout
const PAGE_TIMEOUT_RANGE_MS: (u64, u64) = (100, 120_000);

/// Reasons a scan request is rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid target URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("max pages must be at least 1")]
    ZeroMaxPages,

    #[error("max pages {requested} exceeds the ceiling of {ceiling}")]
    MaxPagesAboveCeiling { requested: u32, ceiling: u32 },

    #[error("page timeout {0}ms is outside 100..=120000ms")]
    PageTimeoutOutOfRange(u64),
}

/// Unvalidated scan input as a caller supplies it
///
/// Omitted fields fall back to the crawler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawScanRequest {
    pub url: String,
    pub max_pages: Option<u32>,
    pub include_screenshot: Option<bool>,
    pub include_html: Option<bool>,
    pub page_timeout_ms: Option<u64>,
}

impl RawScanRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// A validated, immutable scan request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    url: Url,
    max_pages: u32,
    include_screenshot: bool,
    include_html: bool,
    page_timeout_ms: u64,
}

impl ScanRequest {
    /// Validates raw input against the crawler limits
    ///
    /// # Arguments
    ///
    /// * `raw` - Caller input
    /// * `limits` - Supplies the default and ceiling for max pages and the
    ///   default page timeout
    ///
    /// # Returns
    ///
    /// * `Ok(ScanRequest)` - The canonicalized request
    /// * `Err(ValidationError)` - The first problem found
    ///
    /// # Example
    ///
    /// ```
    /// use site_scanner::config::CrawlerConfig;
    /// use site_scanner::jobs::{RawScanRequest, ScanRequest};
    ///
    /// let request = ScanRequest::from_raw(
    ///     RawScanRequest::new("https://Example.com#top"),
    ///     &CrawlerConfig::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(request.url().as_str(), "https://example.com/");
    /// assert_eq!(request.max_pages(), 10);
    /// ```
    pub fn from_raw(raw: RawScanRequest, limits: &CrawlerConfig) -> Result<Self, ValidationError> {
        let url = canonicalize_url(&raw.url)?;

        let max_pages = raw.max_pages.unwrap_or(limits.default_max_pages);
        if max_pages == 0 {
            return Err(ValidationError::ZeroMaxPages);
        }
        if max_pages > limits.max_pages_ceiling {
            return Err(ValidationError::MaxPagesAboveCeiling {
                requested: max_pages,
                ceiling: limits.max_pages_ceiling,
            });
        }

        let page_timeout_ms = raw.page_timeout_ms.unwrap_or(limits.page_timeout_ms);
        let (min, max) = PAGE_TIMEOUT_RANGE_MS;
        if !(min..=max).contains(&page_timeout_ms) {
            return Err(ValidationError::PageTimeoutOutOfRange(page_timeout_ms));
        }

        Ok(Self {
            url,
            max_pages,
            include_screenshot: raw.include_screenshot.unwrap_or(true),
            include_html: raw.include_html.unwrap_or(true),
            page_timeout_ms,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn include_screenshot(&self) -> bool {
        self.include_screenshot
    }

    pub fn include_html(&self) -> bool {
        self.include_html
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}
