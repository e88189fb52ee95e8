//! Client event bus — process-wide notifications emitted by the WhatsApp client.
//!
//! Any number of consumers (command dispatch, the episode scheduler, the CLI
//! status printer) subscribe independently.

pub mod events;
pub mod queue;

pub use events::ClientEvent;
pub use queue::EventBus;
