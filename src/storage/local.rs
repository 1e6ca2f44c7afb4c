//! Per-page output store on the local filesystem.
//!
//! ## Storage Layout
//!
//! ```text
//! {data_dir}/
//! ├── pages/
//! │   ├── page_0001.json    # One PageOutput per listing page
//! │   └── page_0002.json
//! └── media/
//!     └── page_0001/        # Media assets for that page's items
//!         └── 437654_0.jpg
//! ```
//!
//! Page files are written atomically (temp + rename) and never rewritten:
//! an existing file short-circuits reprocessing of its page.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PageOutput, Record};

/// Local filesystem store for page outputs and media.
#[derive(Clone)]
pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    /// Create a store rooted at the given data directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a page's output file.
    pub fn page_path(&self, page: u32) -> PathBuf {
        self.root.join("pages").join(format!("page_{page:04}.json"))
    }

    /// Directory holding a page's media assets.
    pub fn media_dir(&self, page: u32) -> PathBuf {
        self.root.join("media").join(format!("page_{page:04}"))
    }

    /// Whether a page's output has already been fully written.
    pub fn page_exists(&self, page: u32) -> bool {
        self.page_path(page).exists()
    }

    /// Persist a page's output atomically.
    pub async fn write_page(&self, output: &PageOutput) -> Result<()> {
        let path = self.page_path(output.page);
        self.write_json(&path, output).await
    }

    /// Load a page's output, returning `None` if absent.
    pub async fn load_page(&self, page: u32) -> Result<Option<PageOutput>> {
        self.read_json(&self.page_path(page)).await
    }

    /// Page numbers with an output file, ascending.
    pub fn list_pages(&self) -> Result<Vec<u32>> {
        let pages_dir = self.root.join("pages");
        if !pages_dir.exists() {
            return Ok(Vec::new());
        }

        let mut pages: Vec<u32> = std::fs::read_dir(&pages_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("page_")?.strip_suffix(".json"))
                    .and_then(|digits| digits.parse().ok())
            })
            .collect();
        pages.sort_unstable();
        Ok(pages)
    }

    /// Aggregate every page output into one consolidated file.
    ///
    /// Records are ordered by page then listing position, deduplicated by
    /// source address (first occurrence wins). Returns the record count.
    pub async fn export(&self, dest: &Path) -> Result<usize> {
        let mut seen = std::collections::HashSet::new();
        let mut records: Vec<Record> = Vec::new();

        for page in self.list_pages()? {
            let Some(output) = self.load_page(page).await? else {
                continue;
            };
            for record in output.records {
                if record.source_url.is_empty() {
                    continue;
                }
                if seen.insert(record.source_url.clone()) {
                    records.push(record);
                }
            }
        }

        let export = ConsolidatedExport {
            generated_at: chrono::Utc::now(),
            count: records.len(),
            records,
        };
        self.write_json(dest, &export).await?;
        Ok(export.count)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Consolidated export envelope.
#[derive(Debug, Serialize)]
struct ConsolidatedExport {
    generated_at: chrono::DateTime<chrono::Utc>,
    count: usize,
    records: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(url: &str, title: &str) -> Record {
        let mut record = Record::new(url);
        record.set("Title", title);
        record
    }

    #[tokio::test]
    async fn write_and_load_page() {
        let tmp = TempDir::new().unwrap();
        let store = PageStore::new(tmp.path());

        let output = PageOutput::new(3, vec![record("https://example.com/item/1", "One")]);
        store.write_page(&output).await.unwrap();

        assert!(store.page_exists(3));
        let loaded = store.load_page(3).await.unwrap().unwrap();
        assert_eq!(loaded.page, 3);
        assert_eq!(loaded.count, 1);
        assert_eq!(loaded.records[0].get("Title"), Some("One"));
    }

    #[tokio::test]
    async fn load_missing_page_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = PageStore::new(tmp.path());
        assert!(store.load_page(9).await.unwrap().is_none());
        assert!(!store.page_exists(9));
    }

    #[tokio::test]
    async fn list_pages_sorted() {
        let tmp = TempDir::new().unwrap();
        let store = PageStore::new(tmp.path());

        for page in [5, 1, 3] {
            store
                .write_page(&PageOutput::new(page, Vec::new()))
                .await
                .unwrap();
        }
        assert_eq!(store.list_pages().unwrap(), vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn export_dedupes_by_source_address() {
        let tmp = TempDir::new().unwrap();
        let store = PageStore::new(tmp.path());

        store
            .write_page(&PageOutput::new(
                1,
                vec![
                    record("https://example.com/item/1", "One"),
                    record("https://example.com/item/2", "Two"),
                ],
            ))
            .await
            .unwrap();
        store
            .write_page(&PageOutput::new(
                2,
                vec![record("https://example.com/item/2", "Two again")],
            ))
            .await
            .unwrap();

        let dest = tmp.path().join("export.json");
        let count = store.export(&dest).await.unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&dest).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["count"], 2);
        assert_eq!(parsed["records"][1]["fields"]["Title"], "Two");
    }

    #[tokio::test]
    async fn media_dir_is_per_page() {
        let store = PageStore::new("/tmp/data");
        assert!(store.media_dir(7).ends_with("media/page_0007"));
    }
}
