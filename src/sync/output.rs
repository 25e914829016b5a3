use serde::Serialize;
use std::path::PathBuf;

/// JSON output mode for machine-readable sync events
/// Uses NDJSON format (newline-delimited JSON)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Start {
        left: PathBuf,
        right: PathBuf,
        dry_run: bool,
    },
    Copy {
        path: PathBuf,
        from: &'static str,
        reason: &'static str,
        bytes: u64,
    },
    Delete {
        path: PathBuf,
        reason: &'static str,
    },
    CreateDir {
        path: PathBuf,
    },
    Skip {
        path: PathBuf,
        reason: String,
    },
    Summary {
        directories_visited: usize,
        directories_created: usize,
        files_copied: usize,
        files_deleted: usize,
        files_resurrected: usize,
        conflicts_resolved: usize,
        clashes_skipped: usize,
        bytes_copied: u64,
        duration_secs: f64,
    },
}

impl SyncEvent {
    /// Emit this event as JSON to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}
