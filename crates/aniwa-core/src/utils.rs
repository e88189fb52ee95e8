//! Utility helpers — path resolution.

use std::path::{Path, PathBuf};

/// Get the Aniwa data directory (e.g. `~/.aniwa/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".aniwa")
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

/// Resolve a configured session directory.
///
/// Absolute and `~` paths are taken as-is; relative ones are resolved against `base`
/// (normally the data directory), so the bot finds its session regardless of
/// the working directory it was started from.
pub fn resolve_session_dir(session_dir: &str, base: &Path) -> PathBuf {
    let expanded = expand_home(session_dir);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    dirs_next::home_dir()
}
