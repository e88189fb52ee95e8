//! Episode scheduler — "new episode aired" notifications for tracked anime.
//!
//! Architecture:
//! - The "today" store lists the titles airing today, with their weekly broadcast slot
//! - Each pass turns `(HH:MM, timezone)` into an absolute instant and arms one timer per title
//! - On fire, the timer re-reads the store, fetches artwork once, and sends an image
//!   message to every subscriber, collecting per-subscriber failures
//!
//! Network calls only ever happen inside a firing timer.

pub mod airing;
pub mod notification;
pub mod service;

pub use airing::{airing_instant, normalize_time, parse_timezone, preview, AiringPreview, AiringTimeError, BroadcastZone};
pub use notification::{build_caption, build_notification, DispatchReport};
pub use service::{EpisodeScheduler, FireOutcome, SchedulerError};
