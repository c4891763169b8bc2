use anyhow::{Context, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{ProductScraper, panic_message};
use crate::clock::Clock;
use crate::fetcher::ProductSearch;
use crate::models::{FailureStage, KeywordStatus, RunSummary, SearchResult, SummaryEntry};
use crate::storage::ResultStore;

/// Where a keyword is in its search-then-scrape lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordState {
    Pending,
    Searching,
    Scraping,
    Done(KeywordStatus),
}

/// Everything a batch run produced
#[derive(Debug)]
pub struct BatchReport {
    pub summary: RunSummary,
    pub results: Vec<SearchResult>,
    pub summary_path: PathBuf,
}

/// Runs keywords one after another through search and scrape.
///
/// A failure inside one keyword never stops the batch. When a keyword fails after
/// records were already persisted, the persisted records are recovered instead of
/// being reported as lost.
pub struct BatchOrchestrator {
    search: Arc<dyn ProductSearch>,
    scraper: ProductScraper,
    store: ResultStore,
    summary_title: String,
    clock: Arc<dyn Clock>,
}

impl BatchOrchestrator {
    pub fn new(
        search: Arc<dyn ProductSearch>,
        scraper: ProductScraper,
        store: ResultStore,
        site_name: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            search,
            scraper,
            store,
            summary_title: format!("{} Search Summary", site_name),
            clock,
        }
    }

    pub async fn run(&self, keywords: &[String]) -> Result<BatchReport> {
        let mut summary = RunSummary::new(&self.summary_title, self.clock.now());
        let mut results = Vec::new();

        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        info!("Starting batch of {} keywords", keywords.len());

        for (index, keyword) in keywords.iter().enumerate() {
            info!("[{}/{}] Processing keyword '{}'", index + 1, keywords.len(), keyword);
            let (entry, result) = self.run_keyword(keyword).await;
            summary.push(entry);
            results.push(result);
        }

        let summary_path = self
            .store
            .write_summary(&summary)
            .context("Failed to flush run summary")?;

        info!(
            "Batch complete: {} products across {} keywords",
            summary.total_products(),
            summary.entries().len()
        );

        Ok(BatchReport {
            summary,
            results,
            summary_path,
        })
    }

    async fn run_keyword(&self, keyword: &str) -> (SummaryEntry, SearchResult) {
        let mut state = KeywordState::Pending;
        let outcome = AssertUnwindSafe(self.process_keyword(keyword, &mut state))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(result)) => {
                let file = ResultStore::file_name_for(keyword);
                info!("'{}': {} products saved to {}", keyword, result.len(), file);
                let entry = SummaryEntry::success(keyword, result.len(), &file);
                self.transition(keyword, &mut state, KeywordState::Done(entry.status));
                return (entry, result);
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panic: {}", panic_message(&*payload)),
        };

        let (entry, result) = self.recover(keyword, state, failure);
        self.transition(keyword, &mut state, KeywordState::Done(entry.status));
        (entry, result)
    }

    async fn process_keyword(&self, keyword: &str, state: &mut KeywordState) -> Result<SearchResult> {
        self.store.clear(keyword)?;

        self.transition(keyword, state, KeywordState::Searching);
        let urls = self.search.search(keyword).await?;

        let mut result = SearchResult::new(keyword);
        if urls.is_empty() {
            info!("No products found for '{}'", keyword);
            self.store.write_records(keyword, result.records())?;
            return Ok(result);
        }

        self.transition(keyword, state, KeywordState::Scraping);
        for (index, url) in urls.iter().enumerate() {
            if result.contains_url(url) {
                continue;
            }
            debug!("[{}/{}] {}", index + 1, urls.len(), url);

            let record = self.scraper.scrape(url).await;
            result.push(record);
            self.store.write_records(keyword, result.records())?;
        }

        Ok(result)
    }

    /// Salvage whatever the keyword already persisted before it failed.
    ///
    /// Only a keyword that got past clearing its sink can have written anything
    /// this run; a file seen from `Pending` belongs to an earlier run.
    fn recover(&self, keyword: &str, state: KeywordState, failure: String) -> (SummaryEntry, SearchResult) {
        let stage = match state {
            KeywordState::Scraping => FailureStage::Scraping,
            _ => FailureStage::Searching,
        };

        if !matches!(state, KeywordState::Searching | KeywordState::Scraping) {
            error!("'{}' failed before searching: {}", keyword, failure);
            return (SummaryEntry::failed(keyword, stage, failure), SearchResult::new(keyword));
        }

        match self.store.read_records(keyword) {
            Ok(records) => {
                let file = ResultStore::file_name_for(keyword);
                warn!(
                    "'{}' failed ({}), recovered {} products from {}",
                    keyword,
                    failure,
                    records.len(),
                    file
                );
                let result = SearchResult::from_records(keyword, records);
                (SummaryEntry::recovered(keyword, result.len(), &file, failure), result)
            }
            Err(e) => {
                error!("'{}' failed: {} (nothing to recover: {:#})", keyword, failure, e);
                (SummaryEntry::failed(keyword, stage, failure), SearchResult::new(keyword))
            }
        }
    }

    fn transition(&self, keyword: &str, state: &mut KeywordState, next: KeywordState) {
        debug!("'{}': {:?} -> {:?}", keyword, state, next);
        *state = next;
    }
}
