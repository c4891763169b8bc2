use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for the keyword search and product price scraper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub site: SiteConfig,
    pub scraping: ScrapingConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
}

/// Target site and its URL layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub search_path: String,
    pub search_param: String,
    /// Path fragment every product page URL contains
    pub product_path: String,
    pub user_agent: Option<String>,
}

/// Which capability renders product pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Http,
    Browser,
}

/// Fetch and render behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub renderer: RendererKind,
    pub delay_between_requests_ms: u64,
    /// Fixed wait for dynamic content after a browser navigation
    pub settle_delay_ms: u64,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    pub timeout_seconds: u64,
    pub cache_enabled: bool,
    pub cache_expiration_secs: u64,
    pub cache_dir: String,
}

/// Selectors and markers driving name/price extraction and search link discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub name_selector: String,
    pub product_page_price: String,
    pub price_product_predicate: String,
    pub currency_marker: String,
    pub markup_price_selectors: Vec<String>,
    pub search_link_selectors: Vec<String>,
}

/// Where results, summaries and debug snapshots go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: String,
    pub summary_file: String,
    pub debug_dir: Option<String>,
    pub debug_prefix_len: usize,
    /// Currency assigned when the price text carries no currency code
    pub default_currency: Option<String>,
}

impl ScraperConfig {
    /// Layered load: optional TOML file, then `SCRAPER__SECTION__KEY` environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("SCRAPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble scraper configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize scraper configuration")
    }

    /// Explicit path if given, else `configs/scraper.toml` when present, else defaults
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(Some(path)),
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(Some(DEFAULT_CONFIG_PATH))
            }
            None => Self::load(None),
        }
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "configs/scraper.toml";

impl SiteConfig {
    /// Search page URL for a keyword
    pub fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}{}?{}={}",
            self.base_url.trim_end_matches('/'),
            self.search_path,
            self.search_param,
            urlencoding::encode(keyword.trim())
        )
    }

    /// True when the URL lives on the configured site and points at a product page
    pub fn is_product_url(&self, candidate: &str) -> bool {
        let Ok(url) = Url::parse(candidate) else {
            return false;
        };
        if !url.path().contains(&self.product_path) {
            return false;
        }

        match (Url::parse(&self.base_url).ok(), url.host_str()) {
            (Some(base), Some(host)) => match base.host_str() {
                Some(base_host) => strip_www(host) == strip_www(base_host),
                None => false,
            },
            _ => false,
        }
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or("product_price_scraper/0.1")
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Direct Derma".to_string(),
            base_url: "https://www.directdermasupplies.com".to_string(),
            search_path: "/products".to_string(),
            search_param: "Search".to_string(),
            product_path: "/products/".to_string(),
            user_agent: None,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::Http,
            delay_between_requests_ms: 1000,
            settle_delay_ms: 5000,
            max_retries: 3,
            retry_backoff_ms: 1000,
            timeout_seconds: 180,
            cache_enabled: true,
            cache_expiration_secs: 86_400,
            cache_dir: "httpcache".to_string(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            name_selector: "h1".to_string(),
            product_page_price: ".price.price--product-page".to_string(),
            price_product_predicate: "[class*='price'][class*='product']".to_string(),
            currency_marker: "EUR".to_string(),
            markup_price_selectors: vec![
                ".price.price--product-page".to_string(),
                ".product__price-wrap .price".to_string(),
                ".price--product-page".to_string(),
                "div.price".to_string(),
                ".product__price-wrap div.price".to_string(),
            ],
            search_link_selectors: vec![
                ".product-item a[href*='/products/']".to_string(),
                ".grid__item a[href*='/products/']".to_string(),
                "a[href*='/products/']".to_string(),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "search_results".to_string(),
            summary_file: "search_summary.txt".to_string(),
            debug_dir: Some("debug_output".to_string()),
            debug_prefix_len: 50,
            default_currency: None,
        }
    }
}
