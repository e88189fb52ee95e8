//! Explicit handle to the live transport session.
//!
//! The connection manager swaps the transport on every (re)connect; holders of
//! a cloned handle always send through whichever session is current.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use aniwa_core::types::OutgoingImage;

use crate::transport::{Transport, TransportError};

/// Cloneable handle to the current transport session, if any.
#[derive(Clone, Default)]
pub struct SessionHandle {
    current: Arc<RwLock<Option<Arc<dyn Transport>>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new session, returning the one it supersedes.
    pub async fn replace(&self, transport: Arc<dyn Transport>) -> Option<Arc<dyn Transport>> {
        self.current.write().await.replace(transport)
    }

    /// Drop the current session, returning it.
    pub async fn clear(&self) -> Option<Arc<dyn Transport>> {
        self.current.write().await.take()
    }

    pub async fn current(&self) -> Option<Arc<dyn Transport>> {
        self.current.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Send an image through the current session.
    pub async fn send_image(&self, jid: &str, image: &OutgoingImage) -> Result<(), TransportError> {
        // Clone out of the lock so a slow send never blocks a reconnect.
        let transport = self.current().await.ok_or(TransportError::NotConnected)?;
        transport.send_image(jid, image).await?;
        debug!(to = %jid, "image sent");
        Ok(())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = self
            .current
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(true);
        f.debug_struct("SessionHandle")
            .field("connected", &connected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_image(&self, jid: &str, _image: &OutgoingImage) -> Result<(), TransportError> {
            self.sent.lock().await.push(jid.to_string());
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn image() -> OutgoingImage {
        OutgoingImage {
            image: vec![1, 2, 3],
            jpeg_thumbnail: String::new(),
            caption: "hi".into(),
            external_ad_reply: None,
        }
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let handle = SessionHandle::new();
        assert!(!handle.is_connected().await);
        let err = handle.send_image("111@s.whatsapp.net", &image()).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_clones_follow_replacement() {
        let handle = SessionHandle::new();
        let clone = handle.clone();

        let first = Arc::new(RecordingTransport::default());
        let second = Arc::new(RecordingTransport::default());

        assert!(handle.replace(first.clone()).await.is_none());
        clone.send_image("a@s.whatsapp.net", &image()).await.unwrap();

        assert!(handle.replace(second.clone()).await.is_some());
        clone.send_image("b@s.whatsapp.net", &image()).await.unwrap();

        assert_eq!(*first.sent.lock().await, vec!["a@s.whatsapp.net"]);
        assert_eq!(*second.sent.lock().await, vec!["b@s.whatsapp.net"]);

        assert!(clone.clear().await.is_some());
        assert!(!handle.is_connected().await);
    }
}
