//! WhatsApp connection lifecycle for Aniwa.
//!
//! # Architecture
//!
//! - [`transport`] — the seam to the WhatsApp Web protocol (`Transport`, `TransportFactory`)
//! - [`bridge`] — `TransportFactory` over a Baileys bridge process (WebSocket + JSON frames)
//! - [`handle::SessionHandle`] — explicit handle to the live transport, shared with the scheduler
//! - [`relay::EventRelay`] — turns event batches into client events and persists credentials
//! - [`policy::ReconnectPolicy`] — exponential backoff with a retry budget
//! - [`connection::ConnectionManager`] — connect, relay, reconnect or re-pair after logout

pub mod bridge;
pub mod connection;
pub mod handle;
pub mod policy;
pub mod relay;
pub mod transport;

pub use bridge::BridgeFactory;
pub use connection::{ConnectionError, ConnectionManager, VersionSource};
pub use handle::SessionHandle;
pub use policy::ReconnectPolicy;
pub use relay::{EventRelay, Transition};
pub use transport::{
    ConnectionState, ConnectionUpdate, DisconnectInfo, DisconnectReason, EventBatch,
    MessagesUpsert, Transport, TransportError, TransportFactory, TransportSession,
};
