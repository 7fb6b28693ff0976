//! Page rendering capability
//!
//! The crawler never talks to a browser or HTTP client directly. It goes
//! through the [`Renderer`] trait, which loads one URL and hands back the
//! rendered HTML, the final URL after redirects, and optionally a screenshot.
//!
//! # Components
//!
//! - `Renderer`: The capability trait
//! - `HttpRenderer`: A plain HTTP implementation on top of `reqwest` (no JavaScript, no screenshots)
//! - `ChromiumRenderer`: Headless Chrome via `chromiumoxide`, with screenshots
//! - `RendererPool`: Capacity-limited access to a shared renderer

mod chromium;
mod http;
mod pool;

pub use chromium::ChromiumRenderer;
pub use http::{build_http_client, HttpRenderer};
pub use pool::{PooledRenderer, RendererPool};

use crate::config::{Config, RendererEngine};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Output of a successful render
///
/// A non-success HTTP status is still a render result; classifying it is the
/// caller's job.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// HTTP status code of the final response
    pub status_code: u16,

    /// Rendered document
    pub html: String,

    /// PNG bytes, only when a screenshot was requested and the engine supports it
    pub screenshot: Option<Vec<u8>>,

    /// URL after following redirects
    pub final_url: Url,
}

/// Typed render failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("non-HTML content: {content_type}")]
    NonHtml { content_type: String },

    #[error("rendering engine error: {0}")]
    Engine(String),
}

/// Builds the renderer selected by `[renderer] engine`
pub fn build_renderer(config: &Config) -> Result<Arc<dyn Renderer>, reqwest::Error> {
    let renderer: Arc<dyn Renderer> = match config.renderer.engine {
        RendererEngine::Http => Arc::new(HttpRenderer::new(&config.user_agent)?),
        RendererEngine::Chromium => {
            Arc::new(ChromiumRenderer::new(&config.renderer, &config.user_agent))
        }
    };
    Ok(renderer)
}

/// Loads and renders a single page
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `url`, giving up after `timeout`
    ///
    /// # Arguments
    ///
    /// * `url` - The page to load
    /// * `timeout` - Hard ceiling for this render
    /// * `capture_screenshot` - Whether to capture a screenshot of the loaded page
    async fn render(
        &self,
        url: &Url,
        timeout: Duration,
        capture_screenshot: bool,
    ) -> Result<RenderResult, RenderError>;
}
