//! Persistence: per-page outputs and the append-only progress ledger.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── pages/                # One immutable JSON file per catalog page
//! ├── media/                # Downloaded assets, one directory per page
//! └── ledger/               # One JSONL event log per run
//!     └── run_20260807_101500.jsonl
//! ```

pub mod ledger;
pub mod local;

pub use ledger::ProgressLedger;
pub use local::PageStore;
