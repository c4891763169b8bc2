use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

use crate::models::{ProductRecord, TIMESTAMP_FORMAT};
use crate::storage::{keyword_from_path, list_result_files};

const PREVIEW_LIMIT: usize = 5;

/// Rebuilds a summary from result files already on disk, with a short product preview
pub struct SummaryGenerator {
    site_name: String,
}

impl SummaryGenerator {
    pub fn new(site_name: &str) -> Self {
        Self {
            site_name: site_name.to_string(),
        }
    }

    /// Summary text for every result file in `dir`, or `None` when there are none
    pub fn generate(&self, dir: &Path, generated_at: NaiveDateTime) -> Result<Option<String>> {
        let files = list_result_files(dir)?;
        if files.is_empty() {
            warn!("No result files found in {}", dir.display());
            return Ok(None);
        }
        info!("Found {} result files in {}", files.len(), dir.display());

        let mut text = String::new();
        writeln!(
            text,
            "{} Search Summary (Updated) - {}",
            self.site_name,
            generated_at.format(TIMESTAMP_FORMAT)
        )?;
        writeln!(text, "{}\n", "=".repeat(80))?;

        for path in &files {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            let keyword = keyword_from_path(path).unwrap_or_else(|| file_name.clone());
            writeln!(text, "Keyword: {}", keyword)?;

            match read_for_summary(path) {
                Ok(records) => write_products(&mut text, &records, &file_name)?,
                Err(message) => {
                    warn!("Skipping {}: {}", path.display(), message);
                    writeln!(text, "Status: ERROR")?;
                    writeln!(text, "Error: {}", message)?;
                }
            }
            writeln!(text, "{}\n", "-".repeat(50))?;
        }

        Ok(Some(text))
    }

    /// Generate and write the summary; returns false when there was nothing to summarize
    pub fn write(&self, dir: &Path, output: &Path, generated_at: NaiveDateTime) -> Result<bool> {
        let Some(text) = self.generate(dir, generated_at)? else {
            return Ok(false);
        };
        std::fs::write(output, text)
            .with_context(|| format!("Failed to write summary: {}", output.display()))?;
        info!("Summary generated: {}", output.display());
        Ok(true)
    }
}

fn read_for_summary(path: &Path) -> Result<Vec<ProductRecord>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|_| "Invalid JSON format in file".to_string())
}

fn write_products(text: &mut String, records: &[ProductRecord], file_name: &str) -> Result<()> {
    writeln!(text, "Products found: {}", records.len())?;
    writeln!(text, "Results file: {}", file_name)?;

    if records.is_empty() {
        return Ok(());
    }

    writeln!(text, "Products:")?;
    for (index, record) in records.iter().take(PREVIEW_LIMIT).enumerate() {
        writeln!(
            text,
            "  {}. {} - {} {}",
            index + 1,
            record.product_name.as_deref().unwrap_or("Unknown"),
            record.currency.as_deref().unwrap_or(""),
            record.price.as_ref().map(|p| p.as_str()).unwrap_or("N/A"),
        )?;
    }
    if records.len() > PREVIEW_LIMIT {
        writeln!(text, "  ... and {} more products", records.len() - PREVIEW_LIMIT)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use crate::storage::write_json;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(14, 15, 16)
            .unwrap()
    }

    fn product(i: usize) -> ProductRecord {
        ProductRecord::scraped(
            &format!("https://shop.example.com/products/{}", i),
            Some(format!("Tip {}", i)),
            Price::parse(&format!("{}.00", i * 10)),
            Some("EUR".to_string()),
            at(),
        )
    }

    #[test]
    fn test_preview_lists_first_five() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (1..=7).map(product).collect();
        write_json(&dir.path().join("thermage_results.json"), &records).unwrap();

        let text = SummaryGenerator::new("Direct Derma")
            .generate(dir.path(), at())
            .unwrap()
            .unwrap();

        assert!(text.starts_with("Direct Derma Search Summary (Updated) - 2024-05-03 14:15:16\n"));
        assert!(text.contains("Keyword: thermage\nProducts found: 7\nResults file: thermage_results.json\nProducts:\n"));
        assert!(text.contains("  1. Tip 1 - EUR 10.00\n"));
        assert!(text.contains("  5. Tip 5 - EUR 50.00\n"));
        assert!(!text.contains("Tip 6"));
        assert!(text.contains("  ... and 2 more products\n"));
    }

    #[test]
    fn test_invalid_json_becomes_error_block() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken_results.json"), "{not json").unwrap();
        write_json(
            &dir.path().join("ok_results.json"),
            &[ProductRecord::failed("https://shop.example.com/products/x", "HTTP Error: 500", at())],
        )
        .unwrap();

        let text = SummaryGenerator::new("Shop")
            .generate(dir.path(), at())
            .unwrap()
            .unwrap();

        assert!(text.contains("Keyword: broken\nStatus: ERROR\nError: Invalid JSON format in file\n"));
        assert!(text.contains("Keyword: ok\nProducts found: 1\n"));
        assert!(text.contains("  1. Unknown -  N/A\n"));
    }

    #[test]
    fn test_empty_directory_has_no_summary() {
        let dir = tempfile::tempdir().unwrap();
        let generator = SummaryGenerator::new("Shop");

        assert!(generator.generate(dir.path(), at()).unwrap().is_none());
        assert!(!generator.write(dir.path(), &dir.path().join("s.txt"), at()).unwrap());
    }
}
