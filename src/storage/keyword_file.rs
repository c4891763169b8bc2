use anyhow::{Context, Result, anyhow};
use polars::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Read search keywords from a plain text file (one per line) or a CSV column.
///
/// For CSV input the named column is used when present, otherwise the first column.
pub fn read_keywords(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let keywords = if is_csv {
        read_csv_column(path, column)?
    } else {
        read_lines(path)?
    };

    info!("Loaded {} keywords from {}", keywords.len(), path.display());
    Ok(keywords)
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read keyword file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_csv_column(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to parse keyword CSV: {}", path.display()))?;

    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    let selected = match column {
        Some(name) if names.iter().any(|n| n == name) => name.to_string(),
        other => {
            let first = names
                .first()
                .ok_or_else(|| anyhow!("Keyword CSV has no columns: {}", path.display()))?;
            if let Some(missing) = other {
                warn!("Column '{}' not found, using first column '{}'", missing, first);
            }
            first.clone()
        }
    };

    let values = df.column(&selected)?.cast(&DataType::String)?;
    Ok(values
        .str()?
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("nan"))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.txt");
        std::fs::write(&path, "thermage\n\n  eye tip  \nultherapy\n").unwrap();

        assert_eq!(
            read_keywords(&path, None).unwrap(),
            vec!["thermage", "eye tip", "ultherapy"]
        );
    }

    #[test]
    fn test_csv_named_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.csv");
        std::fs::write(&path, "id,Product\n1,thermage\n2,\n3,body tip\n").unwrap();

        assert_eq!(
            read_keywords(&path, Some("Product")).unwrap(),
            vec!["thermage", "body tip"]
        );
    }

    #[test]
    fn test_csv_missing_column_falls_back_to_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.csv");
        std::fs::write(&path, "keyword,notes\nthermage,a\nultherapy,b\n").unwrap();

        assert_eq!(
            read_keywords(&path, Some("Missing")).unwrap(),
            vec!["thermage", "ultherapy"]
        );
    }
}
