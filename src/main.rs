use anyhow::{Result, bail};
use clap::Parser;
use product_price_scraper::clock::{Clock, SystemClock};
use product_price_scraper::config::ScraperConfig;
use product_price_scraper::fetcher::{PageRenderer, SiteSearch, build_renderer};
use product_price_scraper::logging::{LogLevel, init_logging};
use product_price_scraper::pipeline::{BatchOrchestrator, BatchReport, ProductScraper};
use product_price_scraper::report::{SpreadsheetExporter, render_results, rows_from_results};
use product_price_scraper::storage::{ResultStore, read_keywords};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Search the shop for every keyword and scrape prices for the products found
#[derive(Parser, Debug)]
#[command(name = "batch_search", version)]
struct Args {
    /// Keyword file: one keyword per line, or a CSV with a keyword column
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Keyword to search for (repeatable)
    #[arg(short, long)]
    keyword: Vec<String>,

    /// CSV column holding the keywords (defaults to the first column)
    #[arg(long)]
    column: Option<String>,

    /// Directory for per-keyword results and the run summary
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Also export all results to a spreadsheet (.csv or .parquet)
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Scraper configuration file
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

    let mut config = ScraperConfig::resolve(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        config.output.output_dir = dir.clone();
    }

    let mut keywords = args.keyword.clone();
    if let Some(input) = &args.input {
        keywords.extend(read_keywords(input, args.column.as_deref())?);
    }
    if keywords.is_empty() {
        bail!("No keywords given: use --input <FILE> or --keyword <KEYWORD>");
    }

    info!(
        "Starting {} batch search for {} keywords",
        config.site.name,
        keywords.len()
    );

    let renderer = build_renderer(&config).await?;
    let outcome = run_batch(&config, Arc::clone(&renderer), &keywords).await;
    if let Err(e) = renderer.shutdown().await {
        warn!("Failed to shut down renderer: {:#}", e);
    }
    let report = outcome?;

    for result in &report.results {
        println!("{}", render_results(result));
    }

    if let Some(path) = &args.export {
        let rows = rows_from_results(&report.results);
        match SpreadsheetExporter.export(&rows, path) {
            Ok(outcome) => println!("Exported {} products to {}", outcome.rows, path.display()),
            Err(e) => warn!("Spreadsheet export failed: {:#}", e),
        }
    }

    println!(
        "\nBatch search completed. Results saved to {} directory.",
        config.output.output_dir
    );
    println!("Summary saved to {}", report.summary_path.display());

    if !report.summary.any_output() {
        error!("No keyword produced a results file");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_batch(
    config: &ScraperConfig,
    renderer: Arc<dyn PageRenderer>,
    keywords: &[String],
) -> Result<BatchReport> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let search = Arc::new(SiteSearch::new(Arc::clone(&renderer), config));
    let scraper = ProductScraper::from_config(renderer, config, Arc::clone(&clock))?;
    let store = ResultStore::new(&config.output.output_dir, &config.output.summary_file)?;

    let orchestrator = BatchOrchestrator::new(search, scraper, store, &config.site.name, clock);
    orchestrator.run(keywords).await
}
