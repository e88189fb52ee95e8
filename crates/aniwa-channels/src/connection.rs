//! Connection manager — owns the single live WhatsApp session.
//!
//! State machine, driven by `connection.update`:
//! - `connecting` → informational
//! - `open` → `open` on the bus, retry counter reset
//! - `close` (any reason but logout) → reconnect after backoff
//! - `close` (logout) → grace delay, session reset, fresh pairing
//!
//! Credential writes carried by a batch complete before its transition runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use aniwa_core::bus::{ClientEvent, EventBus};
use aniwa_core::config::Config;
use aniwa_core::session::{delete_session, SessionError, SessionStore};
use aniwa_providers::{fetch_latest_version, ProtocolVersion};

use crate::handle::SessionHandle;
use crate::policy::ReconnectPolicy;
use crate::relay::{EventRelay, Transition};
use crate::transport::{EventBatch, TransportError, TransportFactory};

/// Errors that stop the connection manager.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("session storage failed: {0}")]
    Session(#[from] SessionError),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("gave up after {retries} reconnection attempts: {last_error}")]
    RetryBudgetExhausted { retries: u32, last_error: String },
}

/// Where the protocol version comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum VersionSource {
    Pinned(ProtocolVersion),
    /// Looked up on every connect, falling back to the bundled version.
    Latest { url: String },
}

impl VersionSource {
    pub fn from_config(config: &Config) -> Self {
        match config.whatsapp.protocol_version {
            Some(v) => Self::Pinned(ProtocolVersion(v)),
            None => Self::Latest {
                url: config.whatsapp.version_url.clone(),
            },
        }
    }

    async fn resolve(&self) -> ProtocolVersion {
        match self {
            Self::Pinned(v) => *v,
            Self::Latest { url } => {
                let lookup = fetch_latest_version(url).await;
                info!(version = %lookup.version, is_latest = lookup.is_latest, "using WhatsApp Web version");
                lookup.version
            }
        }
    }
}

/// A session produced by [`ConnectionManager::connect`], ready to be pumped.
pub struct ActiveSession {
    pub events: mpsc::Receiver<EventBatch>,
    pub relay: EventRelay,
}

/// Drives connect → relay → reconnect/relogin until stopped.
pub struct ConnectionManager {
    factory: Arc<dyn TransportFactory>,
    store: SessionStore,
    bus: EventBus,
    handle: SessionHandle,
    policy: ReconnectPolicy,
    logout_grace: Duration,
    version: VersionSource,
    shutdown: Arc<Notify>,
    stopped: AtomicBool,
}

impl ConnectionManager {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        store: SessionStore,
        bus: EventBus,
        policy: ReconnectPolicy,
        version: VersionSource,
    ) -> Self {
        Self {
            factory,
            store,
            bus,
            handle: SessionHandle::new(),
            policy,
            logout_grace: Duration::from_millis(3000),
            version,
            shutdown: Arc::new(Notify::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Grace period between a logout and the session reset.
    pub fn with_logout_grace(mut self, grace: Duration) -> Self {
        self.logout_grace = grace;
        self
    }

    /// Handle to the live session, for senders.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Create one transport session from the persisted credentials.
    ///
    /// Supersedes (and closes) the previous session, if any.
    pub async fn connect(&self) -> Result<ActiveSession, ConnectionError> {
        let auth = self.store.load().await?;
        let version = self.version.resolve().await;
        info!(
            registered = auth.is_registered(),
            version = %version,
            "connecting to WhatsApp"
        );

        let creds = auth.creds.clone();
        let session = self.factory.create(auth, version).await?;

        if let Some(previous) = self.handle.replace(session.handle).await {
            if let Err(e) = previous.close().await {
                debug!(error = %e, "closing superseded session failed");
            }
        }

        Ok(ActiveSession {
            events: session.events,
            relay: EventRelay::new(self.store.clone(), self.bus.clone(), creds),
        })
    }

    /// Run until stopped, a session write fails, or the retry budget runs out.
    pub async fn run(&self) -> Result<(), ConnectionError> {
        let mut failures: u32 = 0;

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            let last_error = match self.connect().await {
                Ok(session) => {
                    let outcome = tokio::select! {
                        outcome = self.pump(session, &mut failures) => outcome?,
                        _ = self.shutdown.notified() => break,
                    };
                    self.retire_current().await;

                    match outcome {
                        Transition::Relogin => {
                            self.relogin().await?;
                            failures = 0;
                            continue;
                        }
                        Transition::Reconnect(reason) => match reason {
                            Some(r) => format!("connection closed ({})", r.status_code()),
                            None => "connection closed".to_string(),
                        },
                        Transition::None | Transition::Opened => continue,
                    }
                }
                Err(ConnectionError::Transport(e)) => {
                    warn!(error = %e, "transport session could not be created");
                    e.to_string()
                }
                Err(e) => return Err(e),
            };

            failures += 1;
            if !self.policy.allows(failures) {
                error!(retries = failures - 1, "reconnect budget exhausted");
                return Err(ConnectionError::RetryBudgetExhausted {
                    retries: failures - 1,
                    last_error,
                });
            }

            let delay = self.policy.delay_for(failures);
            info!(attempt = failures, delay_ms = delay.as_millis() as u64, "reconnecting");
            if !self.sleep_or_shutdown(delay).await {
                break;
            }
        }

        self.retire_current().await;
        info!("connection manager stopped");
        Ok(())
    }

    /// Stop the run loop and close the live session.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// [`stop`](Self::stop), then close the live transport right away.
    ///
    /// Needed when the `run` future is dropped instead of awaited to completion.
    pub async fn shutdown(&self) {
        self.stop();
        self.retire_current().await;
    }

    /// Pump events until the session closes. Returns the closing transition.
    async fn pump(
        &self,
        mut session: ActiveSession,
        failures: &mut u32,
    ) -> Result<Transition, ConnectionError> {
        while let Some(batch) = session.events.recv().await {
            match session.relay.handle(batch).await? {
                Transition::None => {}
                Transition::Opened => *failures = 0,
                closing => return Ok(closing),
            }
        }
        warn!("event stream ended without a close update");
        Ok(Transition::Reconnect(None))
    }

    /// Logout path: grace delay, wipe the session, let the loop pair again.
    async fn relogin(&self) -> Result<(), ConnectionError> {
        warn!(grace_ms = self.logout_grace.as_millis() as u64, "logged out, resetting session");
        self.bus.emit(ClientEvent::LoggedOut);

        if !self.sleep_or_shutdown(self.logout_grace).await {
            return Ok(());
        }

        let removed = delete_session(self.store.dir()).await?;
        info!(files = removed, "session deleted, pairing again");
        self.bus.emit(ClientEvent::SessionDeleted);
        Ok(())
    }

    async fn retire_current(&self) {
        if let Some(transport) = self.handle.clear().await {
            if let Err(e) = transport.close().await {
                debug!(error = %e, "closing transport failed");
            }
        }
    }

    /// Sleep, returning `false` when interrupted by shutdown.
    async fn sleep_or_shutdown(&self, delay: Duration) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.shutdown.notified() => false,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
