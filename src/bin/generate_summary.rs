use anyhow::{Result, bail};
use clap::Parser;
use product_price_scraper::clock::{Clock, SystemClock};
use product_price_scraper::config::ScraperConfig;
use product_price_scraper::logging::{LogLevel, init_logging};
use product_price_scraper::report::SummaryGenerator;
use std::path::PathBuf;
use tracing::warn;

/// Rebuild a run summary from existing result files
#[derive(Parser, Debug)]
#[command(name = "generate_summary", version)]
struct Args {
    /// Directory containing *_results.json files
    #[arg(long, default_value = "search_results")]
    input_dir: PathBuf,

    /// Summary file (default: <input-dir>/search_summary_updated.txt)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, env = "SCRAPER_CONFIG")]
    config: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_level)?;

    if !args.input_dir.is_dir() {
        bail!("Input directory {} not found", args.input_dir.display());
    }

    let config = ScraperConfig::resolve(args.config.as_deref())?;
    let output = args
        .output
        .unwrap_or_else(|| args.input_dir.join("search_summary_updated.txt"));

    let generator = SummaryGenerator::new(&config.site.name);
    if generator.write(&args.input_dir, &output, SystemClock.now())? {
        println!("\nSummary generated successfully: {}", output.display());
    } else {
        warn!("Nothing to summarize in {}", args.input_dir.display());
    }

    Ok(())
}
