use anyhow::{Context, Result, anyhow, bail};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{ProductRecord, SearchResult, TIMESTAMP_FORMAT};
use crate::storage::{keyword_from_path, list_result_files, read_json};

/// One product row of the exported sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub keyword: String,
    pub product_name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub product_url: String,
    pub timestamp: String,
}

/// Files written by one export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub rows: usize,
    pub products_path: PathBuf,
    pub aggregate_path: PathBuf,
}

impl ExportRow {
    pub fn new(keyword: &str, record: &ProductRecord) -> Self {
        Self {
            keyword: keyword.to_string(),
            product_name: record.product_name.clone(),
            price: record.price.as_ref().map(|p| p.value()),
            currency: record.currency.clone(),
            product_url: record.product_url.clone(),
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

pub fn rows_from_results(results: &[SearchResult]) -> Vec<ExportRow> {
    results
        .iter()
        .flat_map(|result| {
            result
                .records()
                .iter()
                .map(|record| ExportRow::new(result.keyword(), record))
        })
        .collect()
}

/// Rows from every `*_results.json` in `dir`; unreadable files are skipped
pub fn rows_from_dir(dir: &Path) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::new();
    for path in list_result_files(dir)? {
        let keyword = keyword_from_path(&path).unwrap_or_default();
        match read_json(&path) {
            Ok(records) => rows.extend(records.iter().map(|record| ExportRow::new(&keyword, record))),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(rows)
}

/// Writes product rows as a "Products" table plus a per-keyword price aggregate.
///
/// Each sheet is its own file in the format picked by the output extension
/// (`.csv` or `.parquet`): the "Products" sheet goes to the output path itself and
/// the per-keyword sheet to `<stem>_by_keyword.<ext>` beside it. Workbook formats
/// such as `.xlsx` are rejected.
pub struct SpreadsheetExporter;

impl SpreadsheetExporter {
    pub fn to_dataframe(&self, rows: &[ExportRow]) -> Result<DataFrame> {
        let mut series_vec: Vec<Column> = Vec::with_capacity(6);

        let keywords: Vec<&str> = rows.iter().map(|r| r.keyword.as_str()).collect();
        series_vec.push(Series::new("keyword".into(), keywords).into());

        let names: Vec<Option<&str>> = rows.iter().map(|r| r.product_name.as_deref()).collect();
        series_vec.push(Series::new("product_name".into(), names).into());

        let prices: Vec<Option<f64>> = rows.iter().map(|r| r.price).collect();
        series_vec.push(Series::new("price".into(), prices).into());

        let currencies: Vec<Option<&str>> = rows.iter().map(|r| r.currency.as_deref()).collect();
        series_vec.push(Series::new("currency".into(), currencies).into());

        let urls: Vec<&str> = rows.iter().map(|r| r.product_url.as_str()).collect();
        series_vec.push(Series::new("product_url".into(), urls).into());

        let timestamps: Vec<&str> = rows.iter().map(|r| r.timestamp.as_str()).collect();
        series_vec.push(Series::new("timestamp".into(), timestamps).into());

        DataFrame::new(series_vec).map_err(|e| anyhow!("Failed to create DataFrame: {}", e))
    }

    /// Product count and min/max/average price per keyword, sorted by keyword
    pub fn keyword_aggregate(&self, products: &DataFrame) -> Result<DataFrame> {
        let aggregate = products
            .clone()
            .lazy()
            .group_by([col("keyword")])
            .agg([
                col("product_url").count().alias("product_count"),
                col("price").min().alias("min_price"),
                col("price").max().alias("max_price"),
                col("price").mean().alias("avg_price"),
            ])
            .sort(["keyword"], SortMultipleOptions::default())
            .collect()?;
        Ok(aggregate)
    }

    /// Export to `path` (`.csv` or `.parquet`) and its `<stem>_by_keyword` sibling
    pub fn export(&self, rows: &[ExportRow], path: &Path) -> Result<ExportOutcome> {
        if rows.is_empty() {
            bail!("No product data to export");
        }

        let mut products = self.to_dataframe(rows)?;
        let mut aggregate = self.keyword_aggregate(&products)?;

        let aggregate_path = aggregate_path_for(path)?;
        write_frame(&mut products, path)?;
        write_frame(&mut aggregate, &aggregate_path)?;

        info!(
            "Exported {} products to {} ({} keywords in {})",
            products.height(),
            path.display(),
            aggregate.height(),
            aggregate_path.display()
        );

        Ok(ExportOutcome {
            rows: products.height(),
            products_path: path.to_path_buf(),
            aggregate_path,
        })
    }
}

fn aggregate_path_for(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Export path has no file name: {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    Ok(path.with_file_name(format!("{}_by_keyword.{}", stem, ext)))
}

fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;

    match ext.as_deref() {
        Some("csv") => {
            CsvWriter::new(&mut file).finish(df)?;
        }
        Some("parquet") => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        _ => bail!("Unsupported export format: {} (use .csv or .parquet)", path.display()),
    }
    Ok(())
}
