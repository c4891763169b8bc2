use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{ProductRecord, RunSummary};

const RESULTS_SUFFIX: &str = "_results.json";

/// Per-keyword JSON result files plus the run summary, all under one directory
pub struct ResultStore {
    dir: PathBuf,
    summary_file: String,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>, summary_file: &str) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        Ok(Self {
            dir,
            summary_file: summary_file.to_string(),
        })
    }

    /// `thermage eye tip` -> `thermage_eye_tip_results.json`
    pub fn file_name_for(keyword: &str) -> String {
        let stem: String = keyword
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{}{}", stem, RESULTS_SUFFIX)
    }

    pub fn path_for(&self, keyword: &str) -> PathBuf {
        self.dir.join(Self::file_name_for(keyword))
    }

    /// Drop a result file left over from an earlier run
    pub fn clear(&self, keyword: &str) -> Result<()> {
        let path = self.path_for(keyword);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale results: {}", path.display()))?;
            debug!("Removed stale results file {}", path.display());
        }
        Ok(())
    }

    pub fn write_records(&self, keyword: &str, records: &[ProductRecord]) -> Result<PathBuf> {
        let path = self.path_for(keyword);
        write_json(&path, records)?;
        Ok(path)
    }

    pub fn read_records(&self, keyword: &str) -> Result<Vec<ProductRecord>> {
        read_json(&self.path_for(keyword))
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self.dir.join(&self.summary_file);
        std::fs::write(&path, summary.to_string())
            .with_context(|| format!("Failed to write summary: {}", path.display()))?;
        info!("Summary saved to {}", path.display());
        Ok(path)
    }
}

/// Replace `path` with a pretty-printed JSON array, never leaving a half-written file
pub fn write_json(path: &Path, records: &[ProductRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");

    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write results: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move results into place: {}", path.display()))?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<Vec<ProductRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results: {}", path.display()))?;
    let records = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results: {}", path.display()))?;
    Ok(records)
}

/// All `*_results.json` files in `dir`, sorted by name
pub fn list_result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list results directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_result = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(RESULTS_SUFFIX));
        if is_result && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Keyword label of a result file: its name without the `_results.json` suffix
pub fn keyword_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(RESULTS_SUFFIX).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(url: &str) -> ProductRecord {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        ProductRecord::failed(url, "HTTP Error: 500", ts)
    }

    #[test]
    fn test_file_name_for_keyword() {
        assert_eq!(ResultStore::file_name_for("thermage"), "thermage_results.json");
        assert_eq!(
            ResultStore::file_name_for(" eye tip 0.25/cm2 "),
            "eye_tip_0.25_cm2_results.json"
        );
    }

    #[test]
    fn test_write_read_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("out"), "search_summary.txt").unwrap();

        let records = vec![record("https://shop.example.com/products/a")];
        let path = store.write_records("eye tip", &records).unwrap();
        assert!(path.ends_with("eye_tip_results.json"));
        assert_eq!(store.read_records("eye tip").unwrap(), records);
        assert!(!path.with_extension("json.tmp").exists());

        store.clear("eye tip").unwrap();
        assert!(store.read_records("eye tip").is_err());
        store.clear("eye tip").unwrap();
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path(), "search_summary.txt").unwrap();
        std::fs::write(store.path_for("broken"), "[{\"product_url\": ").unwrap();

        assert!(store.read_records("broken").is_err());
    }

    #[test]
    fn test_list_result_files_and_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path(), "search_summary.txt").unwrap();
        store.write_records("ultherapy", &[]).unwrap();
        store.write_records("eye tip", &[]).unwrap();
        std::fs::write(dir.path().join("search_summary.txt"), "x").unwrap();

        let files = list_result_files(dir.path()).unwrap();
        let keywords: Vec<_> = files.iter().filter_map(|p| keyword_from_path(p)).collect();
        assert_eq!(keywords, vec!["eye_tip", "ultherapy"]);
    }
}
