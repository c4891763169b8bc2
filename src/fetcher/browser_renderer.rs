use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    FetchError, HttpRenderer, NetworkErrorKind, PageRenderer, RenderedPage, is_renderable_status,
};
use crate::config::ScraperConfig;

/// Headless Chromium renderer for pages that build their content with script
pub struct BrowserRenderer {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    /// Plain fetch used to learn the response status before navigating
    probe: HttpRenderer,
    settle: Duration,
}

impl BrowserRenderer {
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg(format!("--user-agent={}", config.site.user_agent()))
            .request_timeout(Duration::from_secs(config.scraping.timeout_seconds))
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser handler error: {}", e);
                }
            }
        });

        info!("Launched headless browser");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
            probe: HttpRenderer::new(config)?,
            settle: Duration::from_millis(config.scraping.settle_delay_ms),
        })
    }

    async fn rendered_markup(&self, url: &str) -> Result<String, FetchError> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| FetchError::Unknown("Browser already shut down".to_string()))?;

        let page = browser.new_page(url).await.map_err(classify_error)?;
        tokio::time::sleep(self.settle).await;

        let markup = page.content().await.map_err(classify_error);
        if let Err(e) = page.close().await {
            debug!("Failed to close browser tab for {}: {}", url, e);
        }
        markup
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let probed = self.probe.fetch(url).await?;
        if !is_renderable_status(probed.status) {
            return Ok(RenderedPage::from_html(url, probed.status, probed.body));
        }

        let markup = self.rendered_markup(url).await?;
        info!("Rendered {} characters from {}", markup.len(), url);
        Ok(RenderedPage::from_html(url, probed.status, markup))
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        browser.close().await?;
        browser.wait().await?;
        self.handler.abort();
        info!("Browser shut down");
        Ok(())
    }
}

impl Drop for BrowserRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn classify_error(error: CdpError) -> FetchError {
    match error {
        CdpError::Timeout => FetchError::Network(NetworkErrorKind::Timeout),
        other => FetchError::Unknown(format!("Unknown error: {}", other)),
    }
}
