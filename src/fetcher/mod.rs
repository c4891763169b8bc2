pub mod error;
pub mod http_renderer;
pub mod page;
pub mod site_search;

#[cfg(feature = "browser")]
pub mod browser_renderer;

pub use error::*;
pub use http_renderer::*;
pub use page::*;
pub use site_search::*;

#[cfg(feature = "browser")]
pub use browser_renderer::BrowserRenderer;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{RendererKind, ScraperConfig};

/// Render capability: fetch a URL and hand back its status, markup and DOM.
///
/// Implementations own their timeout and retry policy and must return in bounded time.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError>;

    /// Release the underlying driver. Called once at the end of a run.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Search capability: keyword to ordered, deduplicated product URLs
#[async_trait]
pub trait ProductSearch: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<String>>;
}

/// Build the renderer selected in configuration
pub async fn build_renderer(config: &ScraperConfig) -> Result<Arc<dyn PageRenderer>> {
    match config.scraping.renderer {
        RendererKind::Http => Ok(Arc::new(HttpRenderer::new(config)?)),
        #[cfg(feature = "browser")]
        RendererKind::Browser => Ok(Arc::new(BrowserRenderer::launch(config).await?)),
        #[cfg(not(feature = "browser"))]
        RendererKind::Browser => {
            anyhow::bail!("Browser rendering requested but this build lacks the `browser` feature")
        }
    }
}
