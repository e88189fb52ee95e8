//! Session reset — wipes every file of a session directory, then the directory.
//!
//! Runs after a logout so the next connection starts a fresh pairing. Failures
//! are not absorbed: a directory that is already gone or not writable aborts
//! the reset, and the caller decides what happens next.

use std::path::Path;

use tracing::info;

use super::SessionError;

/// Delete every file under `dir`, then remove `dir` itself.
///
/// Returns the number of files deleted.
pub async fn delete_session(dir: &Path) -> Result<usize, SessionError> {
    info!(dir = %dir.display(), "deleting session");

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SessionError::io(dir, e))?;

    let mut deleted = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SessionError::io(dir, e))?
    {
        let path = entry.path();
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| SessionError::io(&path, e))?;
        deleted += 1;
    }

    tokio::fs::remove_dir(dir)
        .await
        .map_err(|e| SessionError::io(dir, e))?;

    info!(dir = %dir.display(), files = deleted, "session deleted");
    Ok(deleted)
}
