//! HTTP renderer implementation
//!
//! This module handles all HTTP requests for the scanner, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content, following a bounded redirect chain
//! - Content-Type checks
//! - Error classification into `RenderError`

use crate::config::UserAgentConfig;
use crate::render::{RenderError, RenderResult, Renderer};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_scanner::config::UserAgentConfig;
/// use site_scanner::render::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renderer that fetches raw HTML over HTTP
///
/// It does not execute JavaScript and cannot take screenshots; a requested
/// screenshot is silently absent from the result.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Creates a renderer with a client built from the user agent config
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(
        &self,
        url: &Url,
        timeout: Duration,
        _capture_screenshot: bool,
    ) -> Result<RenderResult, RenderError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let final_url = response.url().clone();

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Error pages are returned as-is; the status decides their fate upstream
        if status.is_success() && !is_html_content_type(&content_type) {
            return Err(RenderError::NonHtml { content_type });
        }

        let html = response.text().await.map_err(classify_error)?;

        tracing::trace!("Rendered {} -> {} ({})", url, final_url, status);

        Ok(RenderResult {
            status_code: status.as_u16(),
            html,
            screenshot: None,
            final_url,
        })
    }
}

/// Returns true for HTML media types, or when the server sent none
pub(super) fn is_html_content_type(content_type: &str) -> bool {
    if content_type.trim().is_empty() {
        return true;
    }
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == "text/html" || media_type == "application/xhtml+xml"
}

fn classify_error(e: reqwest::Error) -> RenderError {
    if e.is_timeout() {
        RenderError::Timeout
    } else if e.is_connect() {
        RenderError::Network(format!("connection failed: {}", e))
    } else if e.is_redirect() {
        RenderError::Network(format!("redirect error: {}", e))
    } else {
        RenderError::Network(e.to_string())
    }
}
