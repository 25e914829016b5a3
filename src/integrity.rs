// Content identity for history entries
//
// A file's identity is the SHA-256 of its full contents, rendered as lowercase hex.

use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the SHA-256 digest of a file's full contents as lowercase hex.
pub fn file_digest(path: &Path) -> Result<String> {
    let hash_err = |source: std::io::Error| SyncError::HashError {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(hash_err)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(hash_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Last modification time of a file, read as UTC.
pub fn modification_time(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| SyncError::ReadDirError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(modified.into())
}
