//! Event relay — turns transport event batches into client events.
//!
//! Each batch goes through four independent checks, in this order:
//! 1. `connection.update` → lifecycle events on the bus, plus the transition
//!    the connection manager must take
//! 2. `creds.update` / `keys.set` → persisted before anything else happens
//! 3. `call` → `new-call` with the first call
//! 4. `messages.upsert` → `new-message` with the first message
//!
//! The transition is returned rather than acted on, so a reconnect triggered by
//! a batch never races the credential write carried by that same batch.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use aniwa_core::bus::{ClientEvent, EventBus};
use aniwa_core::session::{SessionError, SessionStore};

use crate::transport::{ConnectionState, ConnectionUpdate, DisconnectReason, EventBatch};

/// What the connection manager must do after a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Keep pumping events.
    None,
    /// The connection reached `open`.
    Opened,
    /// Transient close: reconnect with backoff.
    Reconnect(Option<DisconnectReason>),
    /// Logged out: wipe the session and pair again.
    Relogin,
}

/// Decide the state-machine transition for a connection update.
pub fn classify(update: &ConnectionUpdate) -> Transition {
    match update.connection {
        Some(ConnectionState::Open) => Transition::Opened,
        Some(ConnectionState::Close) => match update.disconnect_reason() {
            Some(reason) if reason.is_logout() => Transition::Relogin,
            reason => Transition::Reconnect(reason),
        },
        Some(ConnectionState::Connecting) | None => Transition::None,
    }
}

/// Relays one transport session's batches. Lives as long as that session.
pub struct EventRelay {
    store: SessionStore,
    bus: EventBus,
    /// Full credentials; `creds.update` carries partial updates merged into these.
    creds: Value,
}

impl EventRelay {
    pub fn new(store: SessionStore, bus: EventBus, creds: Option<Value>) -> Self {
        Self {
            store,
            bus,
            creds: creds.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }

    /// Current credentials, as last persisted.
    pub fn creds(&self) -> &Value {
        &self.creds
    }

    /// Process one batch.
    pub async fn handle(&mut self, batch: EventBatch) -> Result<Transition, SessionError> {
        let transition = match &batch.connection_update {
            Some(update) => self.on_connection_update(update),
            None => Transition::None,
        };

        if let Some(partial) = batch.creds_update {
            merge_creds(&mut self.creds, partial);
            self.store.save_creds(&self.creds).await?;
        }

        if let Some(keys) = &batch.keys_set {
            self.store.write_keys(keys).await?;
        }

        if let Some(call) = batch.call.and_then(|calls| calls.into_iter().next()) {
            debug!(from = %call.from, status = ?call.status, "incoming call");
            self.bus.emit(ClientEvent::NewCall(call));
        }

        if let Some(message) = batch
            .messages_upsert
            .and_then(|upsert| upsert.messages.into_iter().next())
        {
            debug!(chat_id = ?message.chat_id(), "incoming message");
            self.bus.emit(ClientEvent::NewMessage(message));
        }

        Ok(transition)
    }

    fn on_connection_update(&self, update: &ConnectionUpdate) -> Transition {
        if let Some(qr) = &update.qr {
            info!("pairing QR code received");
            self.bus.emit(ClientEvent::Qr(qr.clone()));
        }

        let transition = classify(update);
        match update.connection {
            Some(ConnectionState::Connecting) => {
                info!("connecting to WhatsApp");
                self.bus.emit(ClientEvent::Connecting);
            }
            Some(ConnectionState::Open) => {
                info!("WhatsApp connection open");
                self.bus.emit(ClientEvent::Open);
            }
            Some(ConnectionState::Close) => {
                let status_code = update.disconnect_reason().map(|r| r.status_code());
                let message = update.last_disconnect.as_ref().and_then(|d| d.message.as_deref());
                warn!(
                    status_code = ?status_code,
                    message = ?message,
                    logout = transition == Transition::Relogin,
                    "WhatsApp connection closed"
                );
            }
            None => {}
        }
        transition
    }
}

/// Shallow-merge a partial credentials update, the way the protocol library applies it.
fn merge_creds(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(current), Value::Object(update)) => {
            for (key, value) in update {
                current.insert(key, value);
            }
        }
        (target, partial) => *target = partial,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
