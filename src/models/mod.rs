// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod identity;
mod ledger;
mod record;

// Re-export all public types
pub use config::{
    CatalogConfig, Config, CrawlerConfig, Header, OutputConfig, SectionRule, SelectorConfig,
};
pub use identity::{EgressSlot, Identity, IdentityPool};
pub use ledger::{action, EventStatus, LedgerEvent, ProgressSnapshot};
pub use record::{PageOutput, Record};

/// Lifecycle of a single catalog page within a run.
///
/// Terminal states are `Done` and `Failed`; both are recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Pending,
    Assigned,
    Fetching,
    Extracting,
    FetchingItems,
    Saving,
    Done,
    Failed,
}

impl PageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageState::Pending => "pending",
            PageState::Assigned => "assigned",
            PageState::Fetching => "fetching",
            PageState::Extracting => "extracting",
            PageState::FetchingItems => "fetching-items",
            PageState::Saving => "saving",
            PageState::Done => "done",
            PageState::Failed => "failed",
        }
    }
}

/// One unit of scheduled work: a page bound to an egress slot index.
#[derive(Debug, Clone, Copy)]
pub struct PageTask {
    /// 1-based page number
    pub page: u32,

    /// Index into the identity pool, assigned round-robin
    pub slot: usize,
}
