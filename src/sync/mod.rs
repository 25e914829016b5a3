pub mod output;
pub mod scanner;
pub mod transfer;

use crate::bisync::{ReconciliationEngine, Replica};
use crate::error::{Result, SyncError};
use indicatif::{ProgressBar, ProgressStyle};
use output::SyncEvent;
use scanner::Scanner;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};
use transfer::Transferrer;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncStats {
    pub directories_visited: usize,
    pub directories_created: usize,
    pub files_copied: usize,
    pub files_deleted: usize,
    pub files_resurrected: usize,
    pub conflicts_resolved: usize,
    pub clashes_skipped: usize,
    pub bytes_copied: u64,
    pub duration: Duration,
}

impl SyncStats {
    /// Copies, deletions and created directories
    pub fn changes(&self) -> usize {
        self.files_copied + self.files_deleted + self.directories_created
    }
}

/// Walks both trees depth-first, reconciling one directory level at a time.
pub struct SyncEngine {
    transferrer: Transferrer,
    quiet: bool,
    json: bool,
}

impl SyncEngine {
    pub fn new(dry_run: bool, quiet: bool, json: bool) -> Self {
        Self {
            transferrer: Transferrer::new(dry_run),
            quiet,
            json,
        }
    }

    fn dry_run(&self) -> bool {
        self.transferrer.is_dry_run()
    }

    /// Synchronize two trees. At least one must already be a directory; the
    /// other is created if missing.
    pub fn sync(&self, left: &Path, right: &Path) -> Result<SyncStats> {
        let start = Instant::now();

        match (left.is_dir(), right.is_dir()) {
            (false, false) => {
                return Err(SyncError::Usage {
                    left: left.to_path_buf(),
                    right: right.to_path_buf(),
                })
            }
            (true, false) => self.transferrer.create_dir(right)?,
            (false, true) => self.transferrer.create_dir(left)?,
            (true, true) => {}
        }

        tracing::info!("Starting sync: {} <-> {}", left.display(), right.display());
        if self.json {
            SyncEvent::Start {
                left: left.to_path_buf(),
                right: right.to_path_buf(),
                dry_run: self.dry_run(),
            }
            .emit();
        }

        let pb = if self.quiet || self.json {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb
        };

        let mut stats = SyncStats::default();
        self.sync_level(left, right, &pb, &mut stats)?;
        stats.duration = start.elapsed();

        pb.finish_and_clear();

        tracing::info!(
            "Sync complete: {} changes ({} copied, {} deleted, {} conflicts) across {} directories",
            stats.changes(),
            stats.files_copied,
            stats.files_deleted,
            stats.conflicts_resolved,
            stats.directories_visited
        );

        if self.json {
            SyncEvent::Summary {
                directories_visited: stats.directories_visited,
                directories_created: stats.directories_created,
                files_copied: stats.files_copied,
                files_deleted: stats.files_deleted,
                files_resurrected: stats.files_resurrected,
                conflicts_resolved: stats.conflicts_resolved,
                clashes_skipped: stats.clashes_skipped,
                bytes_copied: stats.bytes_copied,
                duration_secs: stats.duration.as_secs_f64(),
            }
            .emit();
        }

        Ok(stats)
    }

    /// Reconcile one level, mirror its subdirectories, and recurse into every
    /// subdirectory present on both sides.
    fn sync_level(
        &self,
        left: &Path,
        right: &Path,
        pb: &ProgressBar,
        stats: &mut SyncStats,
    ) -> Result<()> {
        stats.directories_visited += 1;
        pb.set_message(left.display().to_string());
        pb.tick();
        tracing::debug!("Level: {} <-> {}", left.display(), right.display());

        let (mut left_replica, mut right_replica) = if self.dry_run() {
            (Replica::preview(left)?, Replica::preview(right)?)
        } else {
            (Replica::open(left)?, Replica::open(right)?)
        };

        let engine = ReconciliationEngine::new(&self.transferrer, self.json);
        engine.reconcile(&mut left_replica, &mut right_replica, stats)?;

        let left_dirs = list_dirs(left)?;
        let right_dirs = list_dirs(right)?;

        for name in right_dirs.difference(&left_dirs) {
            self.mirror_dir(&left.join(name), stats)?;
        }
        for name in left_dirs.difference(&right_dirs) {
            self.mirror_dir(&right.join(name), stats)?;
        }

        let left_dirs = list_dirs(left)?;
        let right_dirs = list_dirs(right)?;

        for name in left_dirs.intersection(&right_dirs) {
            self.sync_level(&left.join(name), &right.join(name), pb, stats)?;
        }

        Ok(())
    }

    fn mirror_dir(&self, path: &Path, stats: &mut SyncStats) -> Result<()> {
        if path.exists() {
            tracing::warn!(
                "Not creating directory {}: a file with that name exists",
                path.display()
            );
            stats.clashes_skipped += 1;
            if self.json {
                SyncEvent::Skip {
                    path: path.to_path_buf(),
                    reason: "file exists".to_string(),
                }
                .emit();
            }
            return Ok(());
        }

        self.transferrer.create_dir(path)?;
        stats.directories_created += 1;
        if self.json {
            SyncEvent::CreateDir {
                path: path.to_path_buf(),
            }
            .emit();
        }
        Ok(())
    }
}

/// Non-hidden subdirectory names. A directory that does not exist (only possible
/// in dry-run) has none.
fn list_dirs(dir: &Path) -> Result<BTreeSet<String>> {
    if !dir.exists() {
        return Ok(BTreeSet::new());
    }
    Ok(Scanner::new(dir).scan()?.dirs)
}
