//! Append-only progress ledger.
//!
//! One JSONL file per run; each line is a complete, independently parseable
//! [`LedgerEvent`]. Replaying every historical file yields the resume state;
//! no other persisted state records what has been done.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::Result;
use crate::models::{LedgerEvent, ProgressSnapshot};

/// Durable event log for one run, safe under concurrent appenders.
pub struct ProgressLedger {
    path: PathBuf,
    file: Mutex<File>,
}

impl ProgressLedger {
    /// Open a fresh ledger file for this run under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let name = format!("run_{}.jsonl", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of this run's ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single JSON line.
    ///
    /// Fire-and-forget: append failures are logged, never propagated. Losing
    /// a ledger line only costs redone work on the next run.
    pub fn append(&self, event: LedgerEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                log::error!("ledger event serialization failed: {}", e);
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{}", line) {
            log::error!("ledger append failed: {}", e);
        }
    }

    /// Replay every `*.jsonl` file under `dir`, oldest run first, into a
    /// progress snapshot.
    ///
    /// Malformed or truncated lines (an abrupt termination can tear the last
    /// write) are skipped, not fatal.
    pub fn snapshot(dir: &Path) -> Result<ProgressSnapshot> {
        if !dir.exists() {
            return Ok(ProgressSnapshot::default());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        // Run files are timestamp-named, so name order is replay order.
        files.sort();

        let mut events = Vec::new();
        for path in &files {
            let bytes = std::fs::read(path)?;
            let content = String::from_utf8_lossy(&bytes);
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<LedgerEvent>(line) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        log::debug!("skipping malformed ledger line in {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(ProgressSnapshot::fold(events))
    }
}
