//! Extracted item records and per-page output envelopes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted item: labeled fields plus media references.
///
/// The schema is permissive: fields the extractor could not find are simply
/// absent. `source_url` is the natural key for downstream deduplication and
/// must be non-empty in any persisted output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Address of the item's detail document
    pub source_url: String,

    /// Labeled field values, in stable field-name order
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Media URLs referenced by the item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_urls: Vec<String>,

    /// Local paths of media saved for this item, relative to the data dir
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_paths: Vec<String>,
}

impl Record {
    /// Create an empty record for an item document.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            fields: BTreeMap::new(),
            media_urls: Vec::new(),
            media_paths: Vec::new(),
        }
    }

    /// Store a field value; empty names or values are ignored.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if !name.trim().is_empty() && !value.trim().is_empty() {
            self.fields.insert(name, value);
        }
    }

    /// Look up a field value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Number of labeled fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// The ordered records of one catalog page, persisted once per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutput {
    /// 1-based page number
    pub page: u32,

    /// When this output was generated
    pub generated_at: DateTime<Utc>,

    /// Record count
    pub count: usize,

    /// The records, in listing order
    pub records: Vec<Record>,
}

impl PageOutput {
    pub fn new(page: u32, records: Vec<Record>) -> Self {
        Self {
            page,
            generated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_ignores_empty_names_and_values() {
        let mut record = Record::new("https://example.com/item/1");
        record.set("Title", "Portrait");
        record.set("", "ignored");
        record.set("Medium", "  ");

        assert_eq!(record.field_count(), 1);
        assert_eq!(record.get("Title"), Some("Portrait"));
        assert_eq!(record.get("Medium"), None);
    }

    #[test]
    fn record_serializes_without_empty_media_lists() {
        let record = Record::new("https://example.com/item/1");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("media_urls"));
        assert!(!json.contains("media_paths"));
    }

    #[test]
    fn page_output_counts_records() {
        let records = vec![
            Record::new("https://example.com/item/1"),
            Record::new("https://example.com/item/2"),
        ];
        let output = PageOutput::new(4, records);
        assert_eq!(output.page, 4);
        assert_eq!(output.count, 2);
    }
}
