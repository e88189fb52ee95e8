//! WhatsApp session persistence.
//!
//! - [`store::SessionStore`] — reads credentials at startup, rewrites them on every rotation
//! - [`reset::delete_session`] — wipes the session directory after a logout

pub mod reset;
pub mod store;

use std::path::{Path, PathBuf};

pub use reset::delete_session;
pub use store::{AuthState, KeyUpdates, SessionStore};

/// Errors raised by session storage.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
