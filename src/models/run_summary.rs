use chrono::NaiveDateTime;
use std::fmt;

use super::TIMESTAMP_FORMAT;

/// Phase a keyword was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Searching,
    Scraping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordStatus {
    Success,
    PartialRecovery,
    Failed(FailureStage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub keyword: String,
    pub status: KeywordStatus,
    pub count: usize,
    pub error: Option<String>,
    pub results_file: Option<String>,
}

/// Per-run outcome of every keyword, in input order. Never merged across runs.
#[derive(Debug, Clone)]
pub struct RunSummary {
    title: String,
    started_at: NaiveDateTime,
    entries: Vec<SummaryEntry>,
}

impl SummaryEntry {
    pub fn success(keyword: &str, count: usize, results_file: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            status: KeywordStatus::Success,
            count,
            error: None,
            results_file: Some(results_file.to_string()),
        }
    }

    pub fn recovered(keyword: &str, count: usize, results_file: &str, error: String) -> Self {
        Self {
            keyword: keyword.to_string(),
            status: KeywordStatus::PartialRecovery,
            count,
            error: Some(error),
            results_file: Some(results_file.to_string()),
        }
    }

    pub fn failed(keyword: &str, stage: FailureStage, error: String) -> Self {
        Self {
            keyword: keyword.to_string(),
            status: KeywordStatus::Failed(stage),
            count: 0,
            error: Some(error),
            results_file: None,
        }
    }

    /// Whether this keyword left a readable result file behind
    pub fn has_output(&self) -> bool {
        !matches!(self.status, KeywordStatus::Failed(_))
    }
}

impl RunSummary {
    pub fn new(title: &str, started_at: NaiveDateTime) -> Self {
        Self {
            title: title.to_string(),
            started_at,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: SummaryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn entry(&self, keyword: &str) -> Option<&SummaryEntry> {
        self.entries.iter().find(|entry| entry.keyword == keyword)
    }

    pub fn total_products(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    pub fn any_output(&self) -> bool {
        self.entries.iter().any(SummaryEntry::has_output)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} - {}", self.title, self.started_at.format(TIMESTAMP_FORMAT))?;
        writeln!(f, "{}", "=".repeat(80))?;
        writeln!(f)?;

        for entry in &self.entries {
            writeln!(f, "Keyword: {}", entry.keyword)?;
            match entry.status {
                KeywordStatus::Success | KeywordStatus::PartialRecovery => {
                    writeln!(f, "Products found: {}", entry.count)?;
                    if let Some(file) = &entry.results_file {
                        writeln!(f, "Results file: {}", file)?;
                    }
                    if let (KeywordStatus::PartialRecovery, Some(error)) = (entry.status, &entry.error) {
                        writeln!(f, "Recovered after error: {}", error)?;
                    }
                }
                KeywordStatus::Failed(stage) => {
                    let label = match stage {
                        FailureStage::Searching => "FAILED",
                        FailureStage::Scraping => "ERROR",
                    };
                    writeln!(f, "Status: {}", label)?;
                    if let Some(error) = &entry.error {
                        writeln!(f, "Error: {}", error)?;
                    }
                }
            }
            writeln!(f, "{}", "-".repeat(50))?;
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_summary_rendering() {
        let mut summary = RunSummary::new("Direct Derma Search Summary", started());
        summary.push(SummaryEntry::success("thermage", 2, "thermage_results.json"));
        summary.push(SummaryEntry::failed(
            "eye tip",
            FailureStage::Searching,
            "Search page returned HTTP 503".to_string(),
        ));

        let text = summary.to_string();
        let expected = format!(
            "Direct Derma Search Summary - 2024-05-02 09:00:00\n{}\n\n\
             Keyword: thermage\nProducts found: 2\nResults file: thermage_results.json\n{}\n\n\
             Keyword: eye tip\nStatus: FAILED\nError: Search page returned HTTP 503\n{}\n\n",
            "=".repeat(80),
            "-".repeat(50),
            "-".repeat(50),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_recovered_entry_reports_products_found() {
        let mut summary = RunSummary::new("Summary", started());
        summary.push(SummaryEntry::recovered(
            "botox",
            3,
            "botox_results.json",
            "disk full".to_string(),
        ));
        summary.push(SummaryEntry::failed("x", FailureStage::Scraping, "boom".to_string()));

        let text = summary.to_string();
        assert!(text.contains("Keyword: botox\nProducts found: 3\n"));
        assert!(text.contains("Recovered after error: disk full"));
        assert!(text.contains("Status: ERROR\nError: boom"));
        assert_eq!(summary.total_products(), 3);
        assert!(summary.any_output());
    }

    #[test]
    fn test_all_failed_has_no_output() {
        let mut summary = RunSummary::new("Summary", started());
        summary.push(SummaryEntry::failed("x", FailureStage::Searching, "dns".to_string()));
        assert!(!summary.any_output());
        assert_eq!(summary.entry("x").unwrap().count, 0);
    }
}
