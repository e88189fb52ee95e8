//! Transport seam — what the connection manager needs from a WhatsApp Web session.
//!
//! A [`TransportFactory`] turns persisted credentials into a live session: a
//! [`Transport`] handle for outbound messages plus a stream of [`EventBatch`]es.
//! Batches mirror the event map Baileys hands to `ev.process`, one key per event kind.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use aniwa_core::session::{AuthState, KeyUpdates};
use aniwa_core::types::{CallEvent, OutgoingImage, WebMessage};
use aniwa_providers::ProtocolVersion;

// ─────────────────────────────────────────────
// Connection state
// ─────────────────────────────────────────────

/// WhatsApp Web connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

/// Why a connection closed, keyed by the status code WhatsApp reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    ConnectionClosed,
    /// Also reported for timeouts.
    ConnectionLost,
    ConnectionReplaced,
    LoggedOut,
    BadSession,
    RestartRequired,
    MultideviceMismatch,
    Forbidden,
    UnavailableService,
    Unknown(u16),
}

impl DisconnectReason {
    pub fn from_status_code(code: u16) -> Self {
        match code {
            428 => Self::ConnectionClosed,
            408 => Self::ConnectionLost,
            440 => Self::ConnectionReplaced,
            401 => Self::LoggedOut,
            500 => Self::BadSession,
            515 => Self::RestartRequired,
            411 => Self::MultideviceMismatch,
            403 => Self::Forbidden,
            503 => Self::UnavailableService,
            other => Self::Unknown(other),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::ConnectionClosed => 428,
            Self::ConnectionLost => 408,
            Self::ConnectionReplaced => 440,
            Self::LoggedOut => 401,
            Self::BadSession => 500,
            Self::RestartRequired => 515,
            Self::MultideviceMismatch => 411,
            Self::Forbidden => 403,
            Self::UnavailableService => 503,
            Self::Unknown(code) => *code,
        }
    }

    /// Only a logout invalidates the stored credentials.
    pub fn is_logout(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Details of the last disconnect.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisconnectInfo {
    pub status_code: Option<u16>,
    pub message: Option<String>,
}

/// A `connection.update` event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionUpdate {
    pub connection: Option<ConnectionState>,
    pub last_disconnect: Option<DisconnectInfo>,
    /// Pairing QR payload, present while waiting to be scanned.
    pub qr: Option<String>,
    pub is_new_login: Option<bool>,
    pub received_pending_notifications: Option<bool>,
}

impl ConnectionUpdate {
    /// A `connection: open` update.
    pub fn open() -> Self {
        Self {
            connection: Some(ConnectionState::Open),
            ..Default::default()
        }
    }

    /// A `connection: close` update, optionally carrying a status code.
    pub fn closed(status_code: Option<u16>) -> Self {
        Self {
            connection: Some(ConnectionState::Close),
            last_disconnect: Some(DisconnectInfo {
                status_code,
                message: None,
            }),
            ..Default::default()
        }
    }

    /// Disconnect reason, when the update carries a status code.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.last_disconnect
            .as_ref()
            .and_then(|d| d.status_code)
            .map(DisconnectReason::from_status_code)
    }
}

/// A `messages.upsert` event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesUpsert {
    pub messages: Vec<WebMessage>,
    /// `notify` for new messages, `append` for history sync.
    #[serde(rename = "type")]
    pub kind: String,
}

/// One batch of transport events, processed as a unit in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBatch {
    #[serde(rename = "connection.update", skip_serializing_if = "Option::is_none")]
    pub connection_update: Option<ConnectionUpdate>,
    /// Partial credentials to merge into the stored ones.
    #[serde(rename = "creds.update", skip_serializing_if = "Option::is_none")]
    pub creds_update: Option<Value>,
    #[serde(rename = "keys.set", skip_serializing_if = "Option::is_none")]
    pub keys_set: Option<KeyUpdates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<Vec<CallEvent>>,
    #[serde(rename = "messages.upsert", skip_serializing_if = "Option::is_none")]
    pub messages_upsert: Option<MessagesUpsert>,
}

impl EventBatch {
    pub fn connection(update: ConnectionUpdate) -> Self {
        Self {
            connection_update: Some(update),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ─────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────

/// Errors raised by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("not connected to WhatsApp")]
    NotConnected,

    #[error("could not establish transport session: {0}")]
    Connect(String),

    #[error("transport send failed: {0}")]
    Send(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A live WhatsApp Web session, as seen by senders.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an image message to a chat.
    async fn send_image(&self, jid: &str, image: &OutgoingImage) -> Result<(), TransportError>;

    /// Close the session. Closing twice is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}

/// A freshly created session: the send handle plus its event stream.
pub struct TransportSession {
    pub handle: Arc<dyn Transport>,
    pub events: mpsc::Receiver<EventBatch>,
}

/// Creates transport sessions from persisted credentials.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        auth: AuthState,
        version: ProtocolVersion,
    ) -> Result<TransportSession, TransportError>;
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
