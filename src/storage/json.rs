//! Atomic JSON persistence
//!
//! Every state file is written to a sibling temporary file, synced, and then
//! renamed over the target, so a crash mid-write leaves either the old or the
//! new content on disk. Loading fails closed: an unreadable file is an error,
//! never an empty default.

use crate::storage::traits::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes `bytes` to `path` via write-temp-then-rename
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }
    }

    let temp_path = temp_path_for(path);

    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| StorageError::io(&temp_path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StorageError::io(&temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| StorageError::io(&temp_path, e))?;
    drop(file);

    // Atomic rename (overwrites existing file)
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).await
}

/// Loads a JSON file
///
/// # Returns
///
/// * `Ok(None)` - The file does not exist
/// * `Ok(Some(T))` - The file was read and decoded
/// * `Err(StorageError::Corrupt)` - The file exists but does not decode
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let contents = match fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}
