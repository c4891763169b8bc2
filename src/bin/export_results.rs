use anyhow::Result;
use clap::Parser;
use product_price_scraper::logging::{LogLevel, init_logging};
use product_price_scraper::report::{SpreadsheetExporter, rows_from_dir};
use std::path::PathBuf;
use tracing::error;

/// Export every keyword's results to one spreadsheet plus a per-keyword price aggregate
#[derive(Parser, Debug)]
#[command(name = "export_results", version)]
struct Args {
    /// Directory containing *_results.json files
    #[arg(long)]
    input_dir: PathBuf,

    /// Output file, .csv or .parquet
    #[arg(long, default_value = "search_results.csv")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_level)?;

    if !args.input_dir.is_dir() {
        error!("Input directory {} does not exist", args.input_dir.display());
        std::process::exit(1);
    }

    let rows = rows_from_dir(&args.input_dir)?;
    match SpreadsheetExporter.export(&rows, &args.output) {
        Ok(outcome) => {
            println!(
                "\nExport completed successfully. {} products saved to {} (summary: {})",
                outcome.rows,
                outcome.products_path.display(),
                outcome.aggregate_path.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("Export failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
