// History persistence and rescanning for one directory
//
// The store is the only writer of a directory's metadata file. Every update
// re-derives the history from what is on disk, so a run that aborted halfway
// is repaired by the next rescan.

use super::history::{Content, DirectoryHistory, FileHistory, Timestamp, VersionEntry};
use crate::error::{Result, SyncError};
use crate::integrity;
use crate::sync::scanner::Scanner;
use std::path::{Path, PathBuf};

/// Metadata file name. Hidden, so it never appears in its own history.
pub const METADATA_FILE: &str = ".sync";

pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Load the persisted history. A missing or blank file is an empty history.
    pub fn load(&self) -> Result<DirectoryHistory> {
        let path = self.metadata_path();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No sync metadata in {}, starting empty", self.dir.display());
                return Ok(DirectoryHistory::new());
            }
            Err(source) => return Err(SyncError::MetadataRead { path, source }),
        };

        DirectoryHistory::from_json(&content)
            .map_err(|source| SyncError::MetadataCorrupt { path, source })
    }

    /// Rewrite the metadata file in full.
    ///
    /// Not atomic: a crash mid-write leaves a truncated file, which the next
    /// load reports as corrupt.
    pub fn save(&self, history: &DirectoryHistory) -> Result<()> {
        let path = self.metadata_path();

        let content = history.to_json_pretty().map_err(|e| SyncError::MetadataWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;

        std::fs::write(&path, content).map_err(|source| SyncError::MetadataWrite {
            path: path.clone(),
            source,
        })?;

        tracing::trace!("Saved {} ({} names)", path.display(), history.len());
        Ok(())
    }

    /// Load the history and bring it up to date with the directory, without persisting.
    pub fn scan(&self) -> Result<DirectoryHistory> {
        let mut history = self.load()?;
        let changes = self.rescan(&mut history, Timestamp::now())?;
        tracing::debug!("Rescanned {}: {} new entries", self.dir.display(), changes);
        Ok(history)
    }

    /// Rescan the directory and persist the result.
    pub fn update(&self) -> Result<DirectoryHistory> {
        let history = self.scan()?;
        self.save(&history)?;
        Ok(history)
    }

    /// Apply the on-disk state to `history`. Returns the number of entries added.
    ///
    /// Present files record (mtime, digest) when new or changed; names that
    /// vanished record a tombstone stamped `now`.
    fn rescan(&self, history: &mut DirectoryHistory, now: Timestamp) -> Result<usize> {
        let listing = Scanner::new(&self.dir).scan()?;
        let mut changes = 0;

        for name in &listing.files {
            let path = self.dir.join(name);
            let digest = integrity::file_digest(&path)?;
            let modified = Timestamp::from_datetime(integrity::modification_time(&path)?);

            match history.get_mut(name) {
                Some(file_history) => {
                    if file_history.record(modified, Content::Digest(digest)) {
                        tracing::trace!("Changed: {}", path.display());
                        changes += 1;
                    }
                }
                None => {
                    tracing::trace!("New: {}", path.display());
                    history.insert(name.clone(), FileHistory::new(VersionEntry::digest(modified, digest)));
                    changes += 1;
                }
            }
        }

        let vanished: Vec<String> = history
            .iter()
            .filter(|(name, file_history)| {
                !listing.files.contains(name.as_str()) && !file_history.is_deleted()
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in vanished {
            if let Some(file_history) = history.get_mut(&name) {
                tracing::trace!("Gone: {}", self.dir.join(&name).display());
                file_history.record(now, Content::Tombstone);
                changes += 1;
            }
        }

        Ok(changes)
    }
}
