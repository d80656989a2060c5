//! Managed browser session
//!
//! One session backs a whole enrichment batch: the browser is launched
//! once, every item opens its own page, and the session is closed when the
//! batch ends (normally or not). Failing to acquire a session is the one
//! detail-stage fault that aborts a run, since no item can be enriched
//! without it.

use crate::config::{DetailConfig, FetcherConfig};
use crate::ShelfrankError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A launched browser plus its event-handler task
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launches a browser configured for unattended crawling
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserSession)` - Browser launched, handler loop running
    /// * `Err(ShelfrankError)` - Launch failed; the caller should abort
    pub async fn launch(
        detail: &DetailConfig,
        fetcher: &FetcherConfig,
    ) -> Result<Self, ShelfrankError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .request_timeout(Duration::from_secs(30))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", fetcher.user_agent));

        if !detail.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(ShelfrankError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ShelfrankError::Browser(e.to_string()))?;

        // Drain browser events until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless = detail.headless, "browser session started");

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Opens a fresh page at the given URL
    pub async fn open(&self, url: &str) -> Result<Page, ShelfrankError> {
        let page = self.browser.new_page("about:blank").await?;
        page.goto(url).await?;
        Ok(page)
    }

    /// Shuts the browser down and stops the handler loop
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("browser wait after close: {}", e);
        }
        self.handler_task.abort();
        tracing::info!("browser session closed");
    }
}
