use crate::error::{Result, SyncError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Names starting with this character are never synced. The metadata file
/// relies on it to stay out of its own history.
pub const HIDDEN_MARKER: char = '.';

pub fn is_hidden(name: &str) -> bool {
    name.starts_with(HIDDEN_MARKER)
}

/// Non-hidden entries directly inside one directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub files: BTreeSet<String>,
    pub dirs: BTreeSet<String>,
}

/// Lists a single directory level (no recursion)
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn scan(&self) -> Result<DirListing> {
        let mut listing = DirListing::default();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for result in walker {
            let entry = result.map_err(|e| SyncError::ReadDirError {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
                source: e.into(),
            })?;

            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!(
                    "Skipping non UTF-8 name: {}",
                    entry.path().display()
                );
                continue;
            };
            if is_hidden(name) {
                continue;
            }

            let file_type = entry.file_type();
            let (is_file, is_dir) = if file_type.is_symlink() {
                // File links sync their target's contents. Directory links are
                // never descended into, since they can point back up the tree.
                match std::fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_dir() => {
                        tracing::warn!(
                            "Skipping symlinked directory {}",
                            entry.path().display()
                        );
                        continue;
                    }
                    Ok(meta) => (meta.is_file(), false),
                    Err(e) => {
                        tracing::warn!("Skipping broken symlink {}: {}", entry.path().display(), e);
                        continue;
                    }
                }
            } else {
                (file_type.is_file(), file_type.is_dir())
            };

            if is_file {
                listing.files.insert(name.to_string());
            } else if is_dir {
                listing.dirs.insert(name.to_string());
            }
        }

        tracing::trace!(
            "Scanned {}: {} files, {} dirs",
            self.root.display(),
            listing.files.len(),
            listing.dirs.len()
        );

        Ok(listing)
    }
}
