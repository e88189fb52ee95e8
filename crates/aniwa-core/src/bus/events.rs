//! Bus event types — what the client re-emits after normalizing transport batches.

use crate::types::{CallEvent, WebMessage};

/// A normalized client event.
///
/// `Open`, `NewCall` and `NewMessage` are the bot's public surface; the rest
/// report connection lifecycle progress for status displays.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// The WhatsApp connection is established.
    Open,
    /// First call of an inbound call batch.
    NewCall(CallEvent),
    /// First message of an inbound message-upsert batch.
    NewMessage(WebMessage),
    /// A pairing QR code is waiting to be scanned.
    Qr(String),
    /// A connection attempt is in progress.
    Connecting,
    /// The session was logged out from the phone.
    LoggedOut,
    /// The on-disk session was wiped ahead of a fresh pairing.
    SessionDeleted,
}

impl ClientEvent {
    /// Event name as exposed to consumers (`open`, `new-call`, `new-message`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Open => "open",
            ClientEvent::NewCall(_) => "new-call",
            ClientEvent::NewMessage(_) => "new-message",
            ClientEvent::Qr(_) => "qr",
            ClientEvent::Connecting => "connecting",
            ClientEvent::LoggedOut => "logged-out",
            ClientEvent::SessionDeleted => "session-deleted",
        }
    }
}
