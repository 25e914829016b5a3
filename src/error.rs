use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Usage: pairsync <directory1> <directory2>\nNeither {left} nor {right} is an existing directory; at least one must exist.")]
    Usage { left: PathBuf, right: PathBuf },

    #[error("Failed to read directory: {path}\nCause: {source}\nCheck that the directory exists and you have read permissions.")]
    ReadDirError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to copy file: {path}\nCause: {source}\nCheck disk space and write permissions on the destination.")]
    CopyError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to delete file: {path}\nCause: {source}\nCheck write permissions on the containing directory.")]
    DeleteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}\nCause: {source}\nThe parent directory must be writable.")]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to hash file: {path}\nCause: {source}")]
    HashError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read sync metadata: {path}\nCause: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write sync metadata: {path}\nCause: {source}\nThe file may be truncated; fix permissions and re-run.")]
    MetadataWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt sync metadata: {path}\nCause: {source}\nRepair or remove the file by hand; it is never rewritten automatically.")]
    MetadataCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Format bytes for human-readable display
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
