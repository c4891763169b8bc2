use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::{PageRenderer, ProductSearch, RenderedPage};
use crate::config::{ScraperConfig, SiteConfig};

/// Keyword search against the site's own product search page
pub struct SiteSearch {
    renderer: Arc<dyn PageRenderer>,
    site: SiteConfig,
    link_selectors: Vec<String>,
}

impl SiteSearch {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &ScraperConfig) -> Self {
        Self {
            renderer,
            site: config.site.clone(),
            link_selectors: config.selectors.search_link_selectors.clone(),
        }
    }

    /// Product links on a rendered search page, resolved and deduplicated in page order
    fn product_links(&self, page: &RenderedPage) -> Result<Vec<String>> {
        let base = Url::parse(page.url())?;

        let mut hrefs = Vec::new();
        for selector in &self.link_selectors {
            match page.dom().attribute_values(selector, "href") {
                Ok(found) if !found.is_empty() => {
                    debug!("Selector '{}' matched {} links", selector, found.len());
                    hrefs = found;
                    break;
                }
                Ok(_) => debug!("Selector '{}' matched no links", selector),
                Err(e) => warn!("Search link selector failed: {}", e),
            }
        }

        let mut seen = HashSet::new();
        let links = hrefs
            .iter()
            .filter_map(|href| base.join(href).ok())
            .map(|mut url| {
                url.set_fragment(None);
                url.to_string()
            })
            .filter(|url| self.site.is_product_url(url))
            .filter(|url| seen.insert(url.clone()))
            .collect();

        Ok(links)
    }
}

#[async_trait]
impl ProductSearch for SiteSearch {
    async fn search(&self, keyword: &str) -> Result<Vec<String>> {
        let search_url = self.site.search_url(keyword);
        info!("Searching for '{}' at {}", keyword, search_url);

        let page = self
            .renderer
            .render(&search_url)
            .await
            .map_err(|e| anyhow!("Search request failed: {}", e))?;

        if !page.is_renderable() {
            return Err(anyhow!("Search request failed: HTTP Error: {}", page.status()));
        }

        let links = self.product_links(&page)?;
        info!("Found {} product links for '{}'", links.len(), keyword);
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;

    struct StaticRenderer {
        status: u16,
        markup: &'static str,
    }

    #[async_trait]
    impl PageRenderer for StaticRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
            Ok(RenderedPage::from_html(url, self.status, self.markup.to_string()))
        }
    }

    fn search_with(status: u16, markup: &'static str) -> SiteSearch {
        let mut config = ScraperConfig::default();
        config.site.base_url = "https://shop.example.com".to_string();
        SiteSearch::new(Arc::new(StaticRenderer { status, markup }), &config)
    }

    #[tokio::test]
    async fn test_links_are_resolved_filtered_and_deduplicated() {
        let search = search_with(
            200,
            r#"<html><body>
                <div class="product-item"><a href="/products/thermage/eye-tip">Eye</a></div>
                <div class="product-item"><a href="/products/thermage/eye-tip#reviews">Eye again</a></div>
                <div class="product-item"><a href="https://shop.example.com/products/thermage/body-tip">Body</a></div>
                <div class="product-item"><a href="https://elsewhere.example.com/products/x">Other</a></div>
                <a href="/about">About</a>
            </body></html>"#,
        );

        let links = search.search("thermage").await.unwrap();
        assert_eq!(
            links,
            vec![
                "https://shop.example.com/products/thermage/eye-tip",
                "https://shop.example.com/products/thermage/body-tip",
            ]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_later_link_selectors() {
        let search = search_with(
            200,
            r#"<html><body><ul><li><a href="/products/ultherapy/transducer">T</a></li></ul></body></html>"#,
        );

        let links = search.search("ultherapy").await.unwrap();
        assert_eq!(links, vec!["https://shop.example.com/products/ultherapy/transducer"]);
    }

    #[tokio::test]
    async fn test_no_matches_is_an_empty_list() {
        let search = search_with(200, "<html><body><p>No results</p></body></html>");
        assert!(search.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_fails_the_search() {
        let search = search_with(503, "<html></html>");
        let err = search.search("thermage").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
