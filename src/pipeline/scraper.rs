use anyhow::Result;
use chrono::NaiveDateTime;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::panic_message;
use crate::clock::Clock;
use crate::config::ScraperConfig;
use crate::fetcher::{FetchError, PageRenderer, RenderedPage};
use crate::models::ProductRecord;
use crate::processor::{FieldExtractor, NormalizedPrice, PriceNormalizer};
use crate::storage::DebugSink;

/// Drives one product URL through render, extraction and price normalization
pub struct ProductScraper {
    renderer: Arc<dyn PageRenderer>,
    extractor: FieldExtractor,
    normalizer: PriceNormalizer,
    debug_sink: Option<DebugSink>,
    default_currency: Option<String>,
    clock: Arc<dyn Clock>,
}

impl ProductScraper {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        extractor: FieldExtractor,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            renderer,
            extractor,
            normalizer: PriceNormalizer::new()?,
            debug_sink: None,
            default_currency: None,
            clock,
        })
    }

    /// Scraper wired from configuration: selectors, debug snapshots and currency default
    pub fn from_config(
        renderer: Arc<dyn PageRenderer>,
        config: &ScraperConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let scraper = Self::new(renderer, FieldExtractor::new(config.selectors.clone()), clock)?
            .with_default_currency(config.output.default_currency.clone());

        Ok(match &config.output.debug_dir {
            Some(dir) => scraper.with_debug_sink(DebugSink::new(dir, config.output.debug_prefix_len)),
            None => scraper,
        })
    }

    pub fn with_debug_sink(mut self, sink: DebugSink) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    pub fn with_default_currency(mut self, currency: Option<String>) -> Self {
        self.default_currency = currency;
        self
    }

    /// Scrape a URL, reporting fetch failures to the caller
    pub async fn try_scrape(&self, url: &str) -> Result<ProductRecord, FetchError> {
        let page = self.renderer.render(url).await?;
        let scraped_at = self.clock.now();

        if !page.is_renderable() {
            return Err(FetchError::Http(page.status()));
        }

        self.save_snapshot(&page, scraped_at);

        catch_unwind(AssertUnwindSafe(|| self.build_record(&page, scraped_at)))
            .map_err(|payload| FetchError::Unknown(panic_message(&*payload)))
    }

    /// Scrape a URL; every failure becomes a record carrying the error text
    pub async fn scrape(&self, url: &str) -> ProductRecord {
        match self.try_scrape(url).await {
            Ok(record) => {
                info!(
                    "Scraped {}: {} @ {} {}",
                    url,
                    record.product_name.as_deref().unwrap_or("<no name>"),
                    record.currency.as_deref().unwrap_or(""),
                    record.price.as_ref().map(|p| p.as_str()).unwrap_or("<no price>"),
                );
                record
            }
            Err(e) => {
                warn!("Failed to scrape {}: {}", url, e);
                ProductRecord::failed(url, &e, self.clock.now())
            }
        }
    }

    fn build_record(&self, page: &RenderedPage, scraped_at: NaiveDateTime) -> ProductRecord {
        let fields = self.extractor.extract(page);
        let NormalizedPrice { price, currency } = fields
            .price_text
            .as_deref()
            .map(|text| self.normalizer.normalize(text))
            .unwrap_or_default();

        let currency = match (&price, currency) {
            (_, Some(code)) => Some(code),
            (Some(_), None) => self.default_currency.clone(),
            (None, None) => None,
        };

        ProductRecord::scraped(page.url(), fields.name, price, currency, scraped_at)
    }

    fn save_snapshot(&self, page: &RenderedPage, at: NaiveDateTime) {
        let Some(sink) = &self.debug_sink else {
            return;
        };
        match sink.persist(page.url(), page.markup(), at) {
            Ok(path) => debug!("Saved page snapshot to {}", path.display()),
            Err(e) => warn!("Failed to save page snapshot for {}: {:#}", page.url(), e),
        }
    }
}
