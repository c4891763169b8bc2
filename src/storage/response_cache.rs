use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;

/// Filesystem cache of fetched pages, one JSON file per URL
pub struct ResponseCache {
    dir: PathBuf,
    expiration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub fetched_at: DateTime<Utc>,
    pub body: String,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, expiration_secs: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        Ok(Self {
            dir,
            expiration_secs: i64::try_from(expiration_secs).unwrap_or(i64::MAX),
        })
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let key = hex::encode(Sha256::digest(url.as_bytes()));
        self.dir.join(format!("{}.json", key))
    }

    /// Fresh cached response for the URL, if any
    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        let content = std::fs::read_to_string(self.entry_path(url)).ok()?;
        let cached: CachedResponse = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(e) => {
                debug!("Ignoring unreadable cache entry for {}: {}", url, e);
                return None;
            }
        };

        if cached.url != url {
            return None;
        }

        let age = Utc::now().signed_duration_since(cached.fetched_at).num_seconds();
        if age > self.expiration_secs {
            debug!("Cache entry for {} expired ({}s old)", url, age);
            return None;
        }

        Some(cached)
    }

    pub fn put(&self, url: &str, status: u16, body: &str) -> Result<()> {
        let entry = CachedResponse {
            url: url.to_string(),
            status,
            fetched_at: Utc::now(),
            body: body.to_string(),
        };
        let path = self.entry_path(url);
        std::fs::write(&path, serde_json::to_string(&entry)?)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), 3600).unwrap();

        assert!(cache.get("https://shop.example.com/products/a").is_none());

        cache
            .put("https://shop.example.com/products/a", 200, "<html></html>")
            .unwrap();
        let hit = cache.get("https://shop.example.com/products/a").unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, "<html></html>");

        assert!(cache.get("https://shop.example.com/products/b").is_none());
    }

    #[test]
    fn test_expired_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), 60).unwrap();

        let stale = CachedResponse {
            url: "https://shop.example.com/products/a".to_string(),
            status: 200,
            fetched_at: Utc::now() - chrono::Duration::hours(2),
            body: "old".to_string(),
        };
        std::fs::write(
            cache.entry_path(&stale.url),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        assert!(cache.get("https://shop.example.com/products/a").is_none());
    }
}
