use crate::error::{Result, SyncError};
use filetime::FileTime;
use std::path::Path;

/// Filesystem side effects of a sync: copy, delete, mkdir.
///
/// In dry-run mode every operation only logs what it would do.
pub struct Transferrer {
    dry_run: bool,
}

impl Transferrer {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copy a file over `dest`, carrying the source's access and modification
    /// times. Returns the number of bytes written, or None in dry-run.
    pub fn copy_file(&self, source: &Path, dest: &Path) -> Result<Option<u64>> {
        if self.dry_run {
            tracing::info!("Would copy: {} -> {}", source.display(), dest.display());
            return Ok(None);
        }

        let copy_err = |source: std::io::Error| SyncError::CopyError {
            path: dest.to_path_buf(),
            source,
        };

        let bytes = std::fs::copy(source, dest).map_err(copy_err)?;

        // The history records mtime; both replicas must agree on it
        let metadata = std::fs::metadata(source).map_err(copy_err)?;
        let atime = FileTime::from_last_access_time(&metadata);
        let mtime = FileTime::from_last_modification_time(&metadata);
        filetime::set_file_times(dest, atime, mtime).map_err(copy_err)?;

        tracing::info!("Copied: {} -> {}", source.display(), dest.display());
        Ok(Some(bytes))
    }

    pub fn delete_file(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            tracing::info!("Would delete: {}", path.display());
            return Ok(());
        }

        std::fs::remove_file(path).map_err(|source| SyncError::DeleteError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Deleted: {}", path.display());
        Ok(())
    }

    /// Create a directory and any missing parents
    pub fn create_dir(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            tracing::info!("Would create directory: {}", path.display());
            return Ok(());
        }

        std::fs::create_dir_all(path).map_err(|source| SyncError::CreateDirError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Created directory: {}", path.display());
        Ok(())
    }
}
