//! Service components of the crawl pipeline.
//!
//! - `fetcher`: bounded-retry HTTP fetch with per-attempt ledger events
//! - `extractor`: swappable record extraction from fetched documents
//! - `media`: binary asset download and persistence

pub mod extractor;
pub mod fetcher;
pub mod media;

pub use extractor::{Extract, SelectorExtractor};
pub use fetcher::RetryingFetcher;
pub use media::MediaDownloader;
