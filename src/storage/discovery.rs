//! Discovery of resumable sessions in known locations

use crate::state::CrawlSession;
use crate::storage::json::load_json;
use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::SESSION_FILE;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Finds the output directory of the active session for `start_url`
///
/// Each root is checked for a session file directly inside it and inside each
/// of its immediate subdirectories. Only active sessions whose start URL equals
/// `start_url` match.
///
/// # Returns
///
/// * `Ok(None)` - No active session matches
/// * `Ok(Some(dir))` - Exactly one output directory matches
/// * `Err(StorageError::AmbiguousSession)` - More than one matches
/// * `Err(StorageError::Corrupt)` - A candidate session file does not decode
pub async fn discover_session(start_url: &str, roots: &[PathBuf]) -> StorageResult<Option<PathBuf>> {
    let mut matches: Vec<PathBuf> = Vec::new();

    for root in roots {
        for dir in candidate_dirs(root).await? {
            let path = dir.join(SESSION_FILE);
            let Some(session) = load_json::<CrawlSession>(&path).await? else {
                continue;
            };

            if session.is_active && session.start_url == start_url {
                let canonical = fs::canonicalize(&dir).await.unwrap_or(dir);
                if !matches.contains(&canonical) {
                    tracing::debug!("Found resumable session for {} in {:?}", start_url, canonical);
                    matches.push(canonical);
                }
            }
        }
    }

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(StorageError::AmbiguousSession {
            start_url: start_url.to_string(),
            candidates: matches,
        }),
    }
}

/// Lists `root` and its immediate subdirectories
async fn candidate_dirs(root: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut dirs = vec![root.to_path_buf()];

    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(root, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(root, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}
