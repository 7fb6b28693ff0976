//! Headless Chrome renderer
//!
//! Drives a Chrome instance over the DevTools protocol. The browser is
//! launched (or connected to) on first use and shared by every render; each
//! render gets its own tab, which is closed afterwards.

use crate::config::{RendererConfig, UserAgentConfig};
use crate::render::http::is_html_content_type;
use crate::render::{RenderError, RenderResult, Renderer};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use url::Url;

/// Status of the main document, or 0 when the browser does not report one
const NAVIGATION_STATUS_JS: &str = "(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return nav && nav.responseStatus ? nav.responseStatus : 0;
})()";

/// A running browser and the task pumping its DevTools events
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Renderer backed by headless Chrome
///
/// Executes JavaScript and captures full-page PNG screenshots.
pub struct ChromiumRenderer {
    config: RendererConfig,
    user_agent: String,
    session: OnceCell<BrowserSession>,
}

impl ChromiumRenderer {
    /// Creates a renderer; the browser starts on the first render
    pub fn new(config: &RendererConfig, user_agent: &UserAgentConfig) -> Self {
        Self {
            config: config.clone(),
            user_agent: user_agent.header_value(),
            session: OnceCell::new(),
        }
    }

    async fn browser(&self) -> Result<&Browser, RenderError> {
        let session = self.session.get_or_try_init(|| self.launch()).await?;
        Ok(&session.browser)
    }

    async fn launch(&self) -> Result<BrowserSession, RenderError> {
        let (browser, mut handler) = match &self.config.remote_debugging_url {
            Some(url) => {
                tracing::info!("Connecting to remote Chrome instance at {}", url);
                Browser::connect(url.as_str()).await.map_err(engine_error)?
            }
            None => {
                let mut builder = BrowserConfig::builder()
                    .no_sandbox()
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage");
                if let Some(path) = &self.config.chrome_path {
                    builder = builder.chrome_executable(path);
                }
                let config = builder.build().map_err(RenderError::Engine)?;

                tracing::info!("Launching headless Chrome");
                Browser::launch(config).await.map_err(engine_error)?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserSession { browser, handler })
    }

    async fn load(
        &self,
        page: &Page,
        url: &Url,
        capture_screenshot: bool,
    ) -> Result<RenderResult, RenderError> {
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(engine_error)?;

        page.goto(url.as_str())
            .await
            .map_err(|e| RenderError::Network(e.to_string()))?;

        let status_code = match page.evaluate(NAVIGATION_STATUS_JS).await {
            Ok(value) => value.into_value::<u16>().unwrap_or(0),
            Err(_) => 0,
        };
        // Chrome only reports the status for documents it fetched itself
        let status_code = if status_code == 0 { 200 } else { status_code };

        let content_type: String = page
            .evaluate("document.contentType")
            .await
            .map_err(engine_error)?
            .into_value()
            .map_err(engine_error)?;
        if (200..300).contains(&status_code) && !is_html_content_type(&content_type) {
            return Err(RenderError::NonHtml { content_type });
        }

        let final_url = page
            .url()
            .await
            .map_err(engine_error)?
            .and_then(|raw| Url::parse(&raw).ok())
            .unwrap_or_else(|| url.clone());

        let html = page.content().await.map_err(engine_error)?;

        let screenshot = if capture_screenshot {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            match page.screenshot(params).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!("Screenshot of {} failed: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        tracing::trace!("Rendered {} -> {} ({})", url, final_url, status_code);

        Ok(RenderResult {
            status_code,
            html,
            screenshot,
            final_url,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(
        &self,
        url: &Url,
        timeout: Duration,
        capture_screenshot: bool,
    ) -> Result<RenderResult, RenderError> {
        let browser = self.browser().await?;
        let page = browser.new_page("about:blank").await.map_err(engine_error)?;

        let result = tokio::time::timeout(timeout, self.load(&page, url, capture_screenshot))
            .await
            .unwrap_or(Err(RenderError::Timeout));

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }

        result
    }
}

fn engine_error(e: impl Display) -> RenderError {
    RenderError::Engine(e.to_string())
}
