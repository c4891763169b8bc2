use anyhow::{Context, Result, bail};
use clap::Parser;
use product_price_scraper::clock::{Clock, SystemClock};
use product_price_scraper::config::ScraperConfig;
use product_price_scraper::fetcher::{PageRenderer, build_renderer};
use product_price_scraper::logging::{LogLevel, init_logging};
use product_price_scraper::models::SearchResult;
use product_price_scraper::pipeline::ProductScraper;
use product_price_scraper::storage::write_json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Scrape name and price from known product URLs
#[derive(Parser, Debug)]
#[command(name = "scrape_urls", version)]
struct Args {
    /// Single product URL to scrape
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    url: Option<String>,

    /// File with one product URL per line
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output JSON file
    #[arg(long, default_value = "price_data.json")]
    output: PathBuf,

    #[arg(long, env = "SCRAPER_CONFIG")]
    config: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_level)?;

    let config = ScraperConfig::resolve(args.config.as_deref())?;

    let candidates = match (&args.url, &args.input) {
        (Some(url), _) => vec![url.trim().to_string()],
        (None, Some(input)) => std::fs::read_to_string(input)
            .with_context(|| format!("Input file {} not found", input.display()))?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        (None, None) => bail!("Either --url or --input is required"),
    };

    let urls: Vec<String> = candidates
        .into_iter()
        .filter(|url| {
            let valid = config.site.is_product_url(url);
            if !valid {
                warn!("Skipping invalid product URL: {}", url);
            }
            valid
        })
        .collect();
    if urls.is_empty() {
        bail!("No valid product URLs to scrape");
    }
    info!("Scraping {} URLs, output will be saved to {}", urls.len(), args.output.display());

    let renderer = build_renderer(&config).await?;
    let result = scrape_all(&config, Arc::clone(&renderer), &urls).await;
    if let Err(e) = renderer.shutdown().await {
        warn!("Failed to shut down renderer: {:#}", e);
    }
    let result = result?;

    write_json(&args.output, result.records())?;
    info!(
        "Scraping complete. {} results saved to {}",
        result.len(),
        args.output.display()
    );

    Ok(())
}

async fn scrape_all(
    config: &ScraperConfig,
    renderer: Arc<dyn PageRenderer>,
    urls: &[String],
) -> Result<SearchResult> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scraper = ProductScraper::from_config(renderer, config, clock)?;

    let mut result = SearchResult::new("urls");
    for url in urls {
        if result.contains_url(url) {
            continue;
        }
        let record = scraper.scrape(url).await;
        result.push(record);
    }
    Ok(result)
}
