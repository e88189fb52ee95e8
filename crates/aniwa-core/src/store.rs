//! In-memory "today" store — the anime entries expected to air today.
//!
//! Populated and cleared by an external collaborator (a daily refresh job, or
//! the CLI loading a JSON file); read by the episode scheduler. Readers always
//! get a snapshot, never a live reference.

use std::collections::HashMap;
use std::path::Path;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::types::TrackedAnime;

/// Keys of the anime store. Only `today` exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Today,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Today => "today",
        }
    }
}

/// Shared store of tracked anime entries.
#[derive(Debug, Default)]
pub struct AnimeStore {
    entries: RwLock<HashMap<StoreKey, Vec<TrackedAnime>>>,
}

impl AnimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of today's entries. `None` when the key was never populated.
    pub async fn today(&self) -> Option<Vec<TrackedAnime>> {
        self.entries.read().await.get(&StoreKey::Today).cloned()
    }

    /// Snapshot of a single entry by title.
    pub async fn find_today(&self, title: &str) -> Option<TrackedAnime> {
        let entries = self.entries.read().await;
        entries
            .get(&StoreKey::Today)?
            .iter()
            .find(|a| a.title == title)
            .cloned()
    }

    /// Replace today's entries.
    pub async fn set_today(&self, anime: Vec<TrackedAnime>) {
        debug!(count = anime.len(), "today store replaced");
        self.entries.write().await.insert(StoreKey::Today, anime);
    }

    /// Remove one entry by title. Returns whether it was present.
    pub async fn remove_today(&self, title: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&StoreKey::Today) {
            Some(list) => {
                let before = list.len();
                list.retain(|a| a.title != title);
                list.len() < before
            }
            None => false,
        }
    }

    /// Drop today's entries entirely.
    pub async fn clear_today(&self) {
        self.entries.write().await.remove(&StoreKey::Today);
    }

    /// Load today's entries from a JSON array file, replacing the current ones.
    ///
    /// Returns the number of entries loaded.
    pub async fn load_today_file(&self, path: &Path) -> anyhow::Result<usize> {
        let data = tokio::fs::read_to_string(path).await?;
        let anime: Vec<TrackedAnime> = serde_json::from_str(&data)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))?;
        let count = anime.len();
        self.set_today(anime).await;
        info!(path = %path.display(), count, "loaded today store");
        Ok(count)
    }
}
