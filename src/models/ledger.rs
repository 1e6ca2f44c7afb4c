//! Typed ledger events and the progress snapshot fold.
//!
//! Events are append-only and independently parseable; the snapshot is a
//! pure fold over a replayed event stream, so resumability can be tested
//! without touching the filesystem.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known action tags. Free-form strings are allowed; these are the ones
/// the snapshot fold and the tests care about.
pub mod action {
    /// Listing-page fetch
    pub const FETCH_PAGE: &str = "fetch_page";
    /// Item detail fetch
    pub const FETCH_ITEM: &str = "fetch_item";
    /// Media asset fetch
    pub const FETCH_MEDIA: &str = "fetch_media";
    /// Whole-page processing outcome
    pub const PROCESS_PAGE: &str = "process_page";
    /// Run lifecycle marker
    pub const RUN: &str = "run";
}

/// Outcome class of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Retry,
    Failure,
    Info,
}

/// One append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,

    /// Outcome class
    pub status: EventStatus,

    /// Operation tag, e.g. "fetch_page"
    pub action: String,

    /// Page number, when the event is page-scoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Structured detail payload
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub detail: Map<String, Value>,
}

impl LedgerEvent {
    pub fn new(status: EventStatus, action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status,
            action: action.into(),
            page: None,
            detail: Map::new(),
        }
    }

    pub fn success(action: impl Into<String>) -> Self {
        Self::new(EventStatus::Success, action)
    }

    pub fn retry(action: impl Into<String>) -> Self {
        Self::new(EventStatus::Retry, action)
    }

    pub fn failure(action: impl Into<String>) -> Self {
        Self::new(EventStatus::Failure, action)
    }

    pub fn info(action: impl Into<String>) -> Self {
        Self::new(EventStatus::Info, action)
    }

    /// Scope the event to a page.
    pub fn for_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach one detail key/value pair.
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }
}

/// Derived resume state: never stored, recomputed from the ledger at start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Pages with a terminal success `process_page` event
    pub completed: BTreeSet<u32>,

    /// Pages whose last terminal event is a failure `fetch_page`
    pub failed: BTreeSet<u32>,
}

impl ProgressSnapshot {
    /// Fold a replayed event stream, in recording order, into resume state.
    ///
    /// A later success clears an earlier failure; a failure never demotes a
    /// completed page. Failed pages stay eligible for re-admission on the
    /// next run; only `completed` excludes work.
    pub fn fold(events: impl IntoIterator<Item = LedgerEvent>) -> Self {
        let mut snapshot = Self::default();
        for event in events {
            let Some(page) = event.page else { continue };
            match (event.status, event.action.as_str()) {
                (EventStatus::Success, action::PROCESS_PAGE) => {
                    snapshot.completed.insert(page);
                    snapshot.failed.remove(&page);
                }
                (EventStatus::Failure, action::FETCH_PAGE) => {
                    if !snapshot.completed.contains(&page) {
                        snapshot.failed.insert(page);
                    }
                }
                _ => {}
            }
        }
        snapshot
    }

    pub fn is_completed(&self, page: u32) -> bool {
        self.completed.contains(&page)
    }

    /// Pages still to process, ascending: everything not yet completed.
    pub fn pending(&self, total_pages: u32) -> Vec<u32> {
        (1..=total_pages)
            .filter(|page| !self.completed.contains(page))
            .collect()
    }
}
