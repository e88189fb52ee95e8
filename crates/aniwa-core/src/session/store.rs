//! File-backed WhatsApp credential store.
//!
//! Directory layout (one directory per WhatsApp account):
//! - `creds.json` — identity and noise/signal credentials
//! - `<category>-<id>.json` — one file per signal key (pre-keys, sessions, sender keys, ...)
//!
//! The store never interprets the key material: it only reads, writes and deletes it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use super::SessionError;

/// Name of the credentials file inside the session directory.
pub const CREDS_FILE: &str = "creds.json";

/// Key updates pushed by the transport: `category → id → value`, `None` deletes.
pub type KeyUpdates = BTreeMap<String, BTreeMap<String, Option<Value>>>;

/// Everything needed to resume a session without re-pairing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    /// Stored credentials; `None` on first run (fresh pairing).
    pub creds: Option<Value>,
    /// Signal keys keyed by file stem (`<category>-<id>`).
    pub keys: BTreeMap<String, Value>,
}

impl AuthState {
    /// Whether this state can resume a previous pairing.
    pub fn is_registered(&self) -> bool {
        self.creds.is_some()
    }
}

/// File-backed session store.
#[derive(Clone, Debug)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The session directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read credentials and keys, creating the directory when missing.
    pub async fn load(&self) -> Result<AuthState, SessionError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SessionError::io(&self.dir, e))?;

        let mut state = AuthState::default();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| SessionError::io(&self.dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SessionError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };

            let value = read_json(&path).await?;
            if path.file_name().and_then(|n| n.to_str()) == Some(CREDS_FILE) {
                state.creds = Some(value);
            } else {
                state.keys.insert(stem, value);
            }
        }

        info!(
            dir = %self.dir.display(),
            registered = state.is_registered(),
            keys = state.keys.len(),
            "loaded session"
        );
        Ok(state)
    }

    /// Persist rotated credentials.
    pub async fn save_creds(&self, creds: &Value) -> Result<(), SessionError> {
        let path = self.dir.join(CREDS_FILE);
        write_json(&self.dir, &path, creds).await?;
        debug!(path = %path.display(), "saved credentials");
        Ok(())
    }

    /// Apply a batch of key updates: write present values, delete `None` ones.
    pub async fn write_keys(&self, updates: &KeyUpdates) -> Result<(), SessionError> {
        let mut written = 0usize;
        let mut removed = 0usize;

        for (category, keys) in updates {
            for (id, value) in keys {
                let path = self.dir.join(key_file_name(category, id));
                match value {
                    Some(v) => {
                        write_json(&self.dir, &path, v).await?;
                        written += 1;
                    }
                    None => match tokio::fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(SessionError::io(&path, e)),
                    },
                }
            }
        }

        debug!(written, removed, "applied key updates");
        Ok(())
    }
}

/// File name for a signal key, with path-hostile characters replaced.
pub fn key_file_name(category: &str, id: &str) -> String {
    let raw = format!("{category}-{id}.json");
    raw.replace('/', "__").replace(':', "-")
}

async fn read_json(path: &Path) -> Result<Value, SessionError> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SessionError::io(path, e))?;
    serde_json::from_str(&data).map_err(|source| SessionError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_json(dir: &Path, path: &Path, value: &Value) -> Result<(), SessionError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SessionError::io(dir, e))?;
    let json = serde_json::to_string(value).map_err(|source| SessionError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| SessionError::io(path, e))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_fresh_creates_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("auth");
        let store = SessionStore::new(&dir);

        let state = store.load().await.unwrap();
        assert!(dir.is_dir());
        assert!(!state.is_registered());
        assert!(state.keys.is_empty());
    }

    #[tokio::test]
    async fn test_save_creds_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path().join("auth"));
        store.load().await.unwrap();

        store.save_creds(&json!({"me": {"id": "111@s.whatsapp.net"}})).await.unwrap();
        let state = store.load().await.unwrap();
        assert!(state.is_registered());
        assert_eq!(state.creds.unwrap()["me"]["id"], "111@s.whatsapp.net");
    }

    #[tokio::test]
    async fn test_creds_rotation_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path().join("auth"));

        store.save_creds(&json!({"rev": 1})).await.unwrap();
        store.save_creds(&json!({"rev": 2})).await.unwrap();

        let state = store.load().await.unwrap();
        assert_eq!(state.creds.unwrap()["rev"], 2);
    }

    #[tokio::test]
    async fn test_write_and_delete_keys() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path().join("auth"));

        let mut updates = KeyUpdates::new();
        updates
            .entry("pre-key".into())
            .or_default()
            .insert("1".into(), Some(json!({"public": "abc"})));
        updates
            .entry("session".into())
            .or_default()
            .insert("111.0".into(), Some(json!({"s": 1})));
        store.write_keys(&updates).await.unwrap();

        let state = store.load().await.unwrap();
        assert_eq!(state.keys.len(), 2);
        assert_eq!(state.keys["pre-key-1"]["public"], "abc");

        let mut delete = KeyUpdates::new();
        delete.entry("pre-key".into()).or_default().insert("1".into(), None);
        // Deleting a key that never existed is fine.
        delete.entry("pre-key".into()).or_default().insert("99".into(), None);
        store.write_keys(&delete).await.unwrap();

        let state = store.load().await.unwrap();
        assert_eq!(state.keys.len(), 1);
        assert!(state.keys.contains_key("session-111.0"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("auth");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CREDS_FILE), "{ not json").unwrap();

        let err = SessionStore::new(&dir).load().await.unwrap_err();
        assert!(matches!(err, SessionError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_non_json_files_ignored() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("auth");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("README"), "hello").unwrap();

        let state = SessionStore::new(&dir).load().await.unwrap();
        assert!(state.keys.is_empty());
    }

    #[test]
    fn test_key_file_name_sanitized() {
        assert_eq!(key_file_name("pre-key", "1"), "pre-key-1.json");
        assert_eq!(
            key_file_name("sender-key", "g@g.us::111:2"),
            "sender-key-g@g.us--111-2.json"
        );
        assert_eq!(key_file_name("app-state-sync-key", "a/b"), "app-state-sync-key-a__b.json");
    }
}
