// Reconciliation of one directory level
//
// Executes the resolver's plan. After every copy or delete the affected side is
// rescanned, so its history always reflects the last action taken on disk.

use super::history::DirectoryHistory;
use super::resolver::{self, Phase, Reason, Resolution, Side, SyncAction};
use super::store::HistoryStore;
use crate::error::Result;
use crate::sync::output::SyncEvent;
use crate::sync::transfer::Transferrer;
use crate::sync::SyncStats;
use std::path::Path;

/// One side of a directory level: its store and current history
pub struct Replica {
    store: HistoryStore,
    history: DirectoryHistory,
    persist: bool,
}

impl Replica {
    /// Rescan `dir` and persist the refreshed history.
    pub fn open(dir: &Path) -> Result<Self> {
        let store = HistoryStore::new(dir);
        let history = store.update()?;
        Ok(Self {
            store,
            history,
            persist: true,
        })
    }

    /// Rescan `dir` without writing anything. A directory that does not exist
    /// yet reads as empty.
    pub fn preview(dir: &Path) -> Result<Self> {
        let store = HistoryStore::new(dir);
        let history = if dir.is_dir() {
            store.scan()?
        } else {
            DirectoryHistory::new()
        };
        Ok(Self {
            store,
            history,
            persist: false,
        })
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn history(&self) -> &DirectoryHistory {
        &self.history
    }

    fn refresh(&mut self) -> Result<()> {
        if self.persist {
            self.history = self.store.update()?;
        }
        Ok(())
    }
}

pub struct ReconciliationEngine<'a> {
    transferrer: &'a Transferrer,
    json: bool,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(transferrer: &'a Transferrer, json: bool) -> Self {
        Self { transferrer, json }
    }

    /// Bring both sides of one directory level into agreement.
    pub fn reconcile(
        &self,
        left: &mut Replica,
        right: &mut Replica,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let resolutions = resolver::plan(left.history(), right.history());

        if resolutions.is_empty() {
            tracing::debug!(
                "Converged: {} <-> {}",
                left.dir().display(),
                right.dir().display()
            );
            return Ok(());
        }

        tracing::debug!(
            "{} resolutions for {} <-> {}",
            resolutions.len(),
            left.dir().display(),
            right.dir().display()
        );

        for resolution in &resolutions {
            self.apply(resolution, left, right, stats)?;
        }

        Ok(())
    }

    fn apply(
        &self,
        resolution: &Resolution,
        left: &mut Replica,
        right: &mut Replica,
        stats: &mut SyncStats,
    ) -> Result<()> {
        tracing::debug!("{}: {}", resolution.name, resolution.reason);

        let mut applied = false;
        for action in &resolution.actions {
            applied |= match *action {
                SyncAction::Copy { from } => {
                    let (source, dest) = match from {
                        Side::Left => (&*left, &mut *right),
                        Side::Right => (&*right, &mut *left),
                    };
                    self.copy(&resolution.name, resolution.reason, from, source, dest, stats)?
                }
                SyncAction::Delete { on } => {
                    let replica = match on {
                        Side::Left => &mut *left,
                        Side::Right => &mut *right,
                    };
                    self.delete(&resolution.name, resolution.reason, replica, stats)?
                }
            };
        }

        if applied {
            if resolution.reason == Reason::Resurrected {
                stats.files_resurrected += 1;
            }
            if resolution.reason.phase() == Phase::Conflict {
                stats.conflicts_resolved += 1;
            }
        }

        Ok(())
    }

    fn copy(
        &self,
        name: &str,
        reason: Reason,
        from: Side,
        source: &Replica,
        dest: &mut Replica,
        stats: &mut SyncStats,
    ) -> Result<bool> {
        let source_path = source.dir().join(name);
        let dest_path = dest.dir().join(name);

        if dest_path.is_dir() {
            tracing::warn!(
                "Not copying {}: a directory with that name exists at {}",
                source_path.display(),
                dest_path.display()
            );
            stats.clashes_skipped += 1;
            if self.json {
                SyncEvent::Skip {
                    path: dest_path,
                    reason: "directory exists".to_string(),
                }
                .emit();
            }
            return Ok(false);
        }

        let bytes = self.transferrer.copy_file(&source_path, &dest_path)?.unwrap_or(0);
        stats.files_copied += 1;
        stats.bytes_copied += bytes;

        if self.json {
            SyncEvent::Copy {
                path: dest_path,
                from: from.as_str(),
                reason: reason.as_str(),
                bytes,
            }
            .emit();
        }

        dest.refresh()?;
        Ok(true)
    }

    fn delete(
        &self,
        name: &str,
        reason: Reason,
        replica: &mut Replica,
        stats: &mut SyncStats,
    ) -> Result<bool> {
        let path = replica.dir().join(name);

        self.transferrer.delete_file(&path)?;
        stats.files_deleted += 1;

        if self.json {
            SyncEvent::Delete {
                path,
                reason: reason.as_str(),
            }
            .emit();
        }

        replica.refresh()?;
        Ok(true)
    }
}
