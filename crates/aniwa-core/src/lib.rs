//! Aniwa core — the pieces every other crate builds on.
//!
//! - **bus**: process-wide client events (`open`, `new-call`, `new-message`)
//! - **config**: typed config schema, JSON loader, env overrides
//! - **session**: file-backed WhatsApp credential store and session reset
//! - **store**: the in-memory "today" anime store read by the scheduler
//! - **types**: tracked anime entries, inbound WhatsApp payloads, outbound image messages

pub mod bus;
pub mod config;
pub mod session;
pub mod store;
pub mod types;
pub mod utils;
