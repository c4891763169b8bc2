use anyhow::Result;
use async_trait::async_trait;
use std::error::Error as StdError;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use wreq::Client;
use wreq::redirect::Policy;
use wreq_util::Emulation;

use super::{FetchError, NetworkErrorKind, PageRenderer, RenderedPage};
use crate::config::{ScraperConfig, ScrapingConfig};
use crate::storage::ResponseCache;

/// Statuses the fetch layer retries before giving up
const RETRY_STATUSES: [u16; 8] = [408, 429, 500, 502, 503, 504, 522, 524];

const MAX_REDIRECTS: usize = 10;

/// Plain HTTP renderer: the fetched markup is the rendered page
pub struct HttpRenderer {
    client: Client,
    user_agent: String,
    scraping: ScrapingConfig,
    cache: Option<ResponseCache>,
}

/// Raw fetch result before any DOM parsing
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl HttpRenderer {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .emulation(Emulation::Firefox136)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        let cache = if config.scraping.cache_enabled {
            Some(ResponseCache::new(
                &config.scraping.cache_dir,
                config.scraping.cache_expiration_secs,
            )?)
        } else {
            None
        };

        Ok(HttpRenderer {
            client,
            user_agent: config.site.user_agent().to_string(),
            scraping: config.scraping.clone(),
            cache,
        })
    }

    /// Fetch a URL through the cache, retrying transient failures
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(url) {
                debug!("Cache hit for {} (HTTP {})", url, hit.status);
                return Ok(FetchedPage {
                    status: hit.status,
                    body: hit.body,
                });
            }
        }

        let page = self.fetch_with_retry(url).await?;

        if let Some(cache) = self.cache.as_ref().filter(|_| (200..300).contains(&page.status)) {
            if let Err(e) = cache.put(url, page.status, &page.body) {
                warn!("Failed to cache response for {}: {:#}", url, e);
            }
        }

        Ok(page)
    }

    /// Exponential backoff with jitter between attempts
    async fn fetch_with_retry(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let max_attempts = self.scraping.max_retries + 1;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let outcome = self.fetch_once(url).await;

            let retryable = match &outcome {
                Ok(page) => RETRY_STATUSES.contains(&page.status),
                Err(e) => e.is_retryable(),
            };
            if !retryable || attempts >= max_attempts {
                return outcome;
            }

            let base = self.scraping.retry_backoff_ms;
            let delay = Duration::from_millis(
                base.saturating_mul(2_u64.saturating_pow(attempts as u32))
                    + rand::random::<u64>() % (base + 1),
            );
            match &outcome {
                Ok(page) => warn!(
                    "Attempt {} for {} returned HTTP {}, retrying in {:?}",
                    attempts, url, page.status, delay
                ),
                Err(e) => warn!(
                    "Attempt {} failed for {}, retrying in {:?}: {}",
                    attempts, url, delay, e
                ),
            }
            sleep(delay).await;
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if self.scraping.delay_between_requests_ms > 0 {
            let delay = Duration::from_millis(
                self.scraping.delay_between_requests_ms + rand::random::<u64>() % 500,
            );
            sleep(delay).await;
        }

        let limit = Duration::from_secs(self.scraping.timeout_seconds);
        let request = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en");

        let response = match timeout(limit, request.send()).await {
            Err(_) => return Err(FetchError::Network(NetworkErrorKind::Timeout)),
            Ok(Err(e)) => return Err(classify_error(&e)),
            Ok(Ok(response)) => response,
        };

        let status = response.status().as_u16();
        let body = match timeout(limit, response.text()).await {
            Err(_) => return Err(FetchError::Network(NetworkErrorKind::Timeout)),
            Ok(Err(e)) => return Err(classify_error(&e)),
            Ok(Ok(body)) => body,
        };

        info!("Fetched {} characters from {} (HTTP {})", body.len(), url, status);
        Ok(FetchedPage { status, body })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let fetched = self.fetch(url).await?;
        Ok(RenderedPage::from_html(url, fetched.status, fetched.body))
    }
}

fn classify_error(error: &wreq::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::Network(NetworkErrorKind::Timeout);
    }

    let chain = error_chain(error);
    if is_dns_failure(&chain) {
        FetchError::Network(NetworkErrorKind::DnsLookup)
    } else {
        FetchError::Unknown(format!("Unknown error: {}", chain))
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut messages = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        messages.push(cause.to_string());
        source = cause.source();
    }
    messages.join(": ")
}

fn is_dns_failure(chain: &str) -> bool {
    let lower = chain.to_lowercase();
    ["dns error", "failed to lookup address", "name or service not known", "no such host"]
        .iter()
        .any(|marker| lower.contains(marker))
}
