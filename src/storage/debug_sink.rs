use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Saves rendered markup for post-hoc inspection of extraction misses
#[derive(Debug, Clone)]
pub struct DebugSink {
    dir: PathBuf,
    prefix_len: usize,
}

impl DebugSink {
    pub fn new(dir: impl Into<PathBuf>, prefix_len: usize) -> Self {
        Self {
            dir: dir.into(),
            prefix_len,
        }
    }

    /// `<YYYYmmdd_HHMMSS>_<sanitized url prefix>.html`
    pub fn file_name(&self, url: &str, at: NaiveDateTime) -> String {
        let sanitized: String = url
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .take(self.prefix_len)
            .collect();
        format!("{}_{}.html", at.format("%Y%m%d_%H%M%S"), sanitized)
    }

    pub fn persist(&self, url: &str, markup: &str, at: NaiveDateTime) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create debug directory: {}", self.dir.display()))?;

        let path = self.dir.join(self.file_name(url, at));
        std::fs::write(&path, markup)
            .with_context(|| format!("Failed to write debug snapshot: {}", path.display()))?;
        Ok(path)
    }
}
