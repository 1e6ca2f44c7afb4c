//! Pipeline entry points for crawler operations.
//!
//! - `run_crawl`: process all pending catalog pages from the resumed state
//! - `limiter`: per-task randomized request pacing

pub mod crawl;
pub mod limiter;

pub use crawl::{CrawlReport, run_crawl};
