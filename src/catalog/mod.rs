//! Catalog loading.
//!
//! Reads raw product records from a JSON export file, or from every export
//! file under a directory. `.json` files hold an array of records, `.jsonl`
//! files hold one record per line.

use crate::models::RawProduct;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const EXTENSIONS: &[&str] = &["json", "jsonl"];

/// Loader for catalog exports.
pub struct CatalogLoader {
    root: PathBuf,
    show_progress: bool,
}

impl CatalogLoader {
    /// Create a loader for a file or directory.
    pub fn new(root: PathBuf, show_progress: bool) -> Self {
        Self {
            root,
            show_progress,
        }
    }

    /// List the export files to read, in path order.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            anyhow::bail!("Input not found: {}", self.root.display());
        }

        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()));

        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to walk {}", self.root.display()))?;
            if entry.file_type().is_file() && is_export(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!("Found {} export files under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Read every record from every export file.
    pub fn load(&self) -> Result<Vec<RawProduct>> {
        let files = self.scan()?;
        let progress = self.progress_bar(files.len() as u64);
        let mut records = Vec::new();

        for path in &files {
            progress.set_message(path.display().to_string());
            let batch = read_file(path)?;
            debug!("{}: {} records", path.display(), batch.len());
            records.extend(batch);
            progress.inc(1);
        }

        progress.finish_and_clear();
        info!("Loaded {} records from {} files", records.len(), files.len());

        Ok(records)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Parse one export file.
pub fn read_file(path: &Path) -> Result<Vec<RawProduct>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

    if has_extension(path, "jsonl") {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("Failed to parse {} line {}", path.display(), i + 1)
                })
            })
            .collect()
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }
}

fn is_export(path: &Path) -> bool {
    EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECORDS: &str = r#"[
        {"product_id": 1, "brand_name": "Amoxil", "price": 120.5, "dosage_form": "Tablet", "pack_size": 10},
        {"product_id": 2, "brand_name": "Calpol", "price": null}
    ]"#;

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, RECORDS).unwrap();

        let records = CatalogLoader::new(path, false).load().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].price, Some(120.5));
        assert_eq!(records[0].pack_size, Some(10));
        assert_eq!(records[1].price, None);
        assert!(records[1].dosage_form.is_empty());
    }

    #[test]
    fn test_load_nested_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("2024/q1")).unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("a.json"), RECORDS).unwrap();
        fs::write(
            dir.path().join("2024/q1/b.jsonl"),
            "{\"product_id\": 3, \"price\": 9.0}\n\n{\"product_id\": 4, \"price\": 11.0}\n",
        )
        .unwrap();
        fs::write(dir.path().join(".cache/c.json"), RECORDS).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loader = CatalogLoader::new(dir.path().to_path_buf(), false);
        assert_eq!(loader.scan().unwrap().len(), 2);

        let records = loader.load().unwrap();
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_unreadable_price_and_pack_size_load_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.json");
        fs::write(
            &path,
            r#"[
                {"product_id": 1, "price": 10.0},
                {"product_id": 2, "price": "N/A"},
                {"product_id": 3, "price": "12.5", "pack_size": -1},
                {"product_id": 4, "price": 8.0, "pack_size": "ten"}
            ]"#,
        )
        .unwrap();

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].price, None);
        assert_eq!(records[2].price, Some(12.5));
        assert_eq!(records[2].pack_size, None);
        assert_eq!(records[3].pack_size, None);

        let catalog = crate::normalize::normalize(records);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.rows_dropped(), 1);
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let loader = CatalogLoader::new(dir.path().join("nope.json"), false);
        assert!(loader.load().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
