//! Episode scheduler service.
//!
//! Architecture:
//! - `scheduled`: titles that already got a timer; a title in this set is never re-armed
//! - `timers`: armed timers keyed by title, removed when they fire
//! - A pass reads the "today" snapshot and arms one timer per new, still-upcoming title
//! - A firing timer re-reads the store, so edits made after arming (new episode
//!   number, subscribers, `delayed`) are honored and removed entries are skipped

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use aniwa_channels::SessionHandle;
use aniwa_core::store::AnimeStore;
use aniwa_providers::{AnimeSearch, MediaFetcher, ProviderError};

use crate::airing::airing_instant;
use crate::notification::{build_notification, DispatchReport};

/// Errors that abort a single fire.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("metadata lookup for \"{title}\" failed: {source}")]
    Metadata {
        title: String,
        #[source]
        source: ProviderError,
    },

    #[error("downloading {url} failed: {source}")]
    Media {
        url: String,
        #[source]
        source: ProviderError,
    },
}

/// What a fired timer did.
#[derive(Clone, Debug, PartialEq)]
pub enum FireOutcome {
    /// The entry left the store before the timer fired.
    Removed,
    /// The episode is marked delayed; nobody was notified.
    Delayed,
    Dispatched(DispatchReport),
}

// ─────────────────────────────────────────────
// EpisodeScheduler
// ─────────────────────────────────────────────

/// Arms one timer per title airing today and notifies subscribers on fire.
pub struct EpisodeScheduler {
    store: Arc<AnimeStore>,
    session: SessionHandle,
    search: Arc<dyn AnimeSearch>,
    media: Arc<dyn MediaFetcher>,
    reference_logo_url: String,
    scheduled: Mutex<HashSet<String>>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    shutdown: Notify,
    stopped: AtomicBool,
}

impl EpisodeScheduler {
    pub fn new(
        store: Arc<AnimeStore>,
        session: SessionHandle,
        search: Arc<dyn AnimeSearch>,
        media: Arc<dyn MediaFetcher>,
        reference_logo_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            session,
            search,
            media,
            reference_logo_url: reference_logo_url.into(),
            scheduled: Mutex::new(HashSet::new()),
            timers: Mutex::new(HashMap::new()),
            shutdown: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    // ─────────────────────────────────────────
    // Arming
    // ─────────────────────────────────────────

    /// Run one scheduling pass against the current time.
    pub async fn schedule_pass(self: &Arc<Self>) -> usize {
        self.schedule_at(Utc::now()).await
    }

    /// Run one scheduling pass as of `now`. Returns the number of timers armed.
    pub async fn schedule_at(self: &Arc<Self>, now: DateTime<Utc>) -> usize {
        let entries = match self.store.today().await {
            Some(entries) if !entries.is_empty() => entries,
            _ => {
                debug!("nothing airing today");
                return 0;
            }
        };

        let mut armed = 0;
        for anime in entries {
            let data = &anime.broadcast_data;
            let at = match airing_instant(&data.time, &data.timezone, now) {
                Ok(at) => at,
                Err(e) => {
                    warn!(title = %anime.title, error = %e, "skipping entry with unusable broadcast slot");
                    continue;
                }
            };

            let delay_ms = (at - now).num_milliseconds();
            if delay_ms < 0 {
                debug!(title = %anime.title, delay_ms, "already aired, not scheduling");
                continue;
            }

            if !self.scheduled.lock().await.insert(anime.title.clone()) {
                continue;
            }

            self.arm(anime.title.clone(), Duration::from_millis(delay_ms as u64))
                .await;
            info!(title = %anime.title, ep = anime.ep, at = %at, delay_ms, "episode scheduled");
            armed += 1;
        }
        armed
    }

    async fn arm(self: &Arc<Self>, title: String, delay: Duration) {
        // Held across the spawn so a zero-delay timer can't remove itself before it's inserted.
        let mut timers = self.timers.lock().await;
        let this = Arc::clone(self);
        let key = title.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.timers.lock().await.remove(&title);
            match this.dispatch(&title).await {
                Ok(FireOutcome::Dispatched(report)) if !report.is_complete() => {
                    warn!(title = %title, sent = report.sent.len(), failed = report.failed.len(), "some notifications failed");
                }
                Ok(outcome) => debug!(title = %title, outcome = ?outcome, "timer done"),
                Err(e) => error!(title = %title, error = %e, "episode notification aborted"),
            }
        });
        timers.insert(key, task);
    }

    // ─────────────────────────────────────────
    // Firing
    // ─────────────────────────────────────────

    /// Fire the notification for `title` now. An armed timer for it is cancelled.
    pub async fn fire(&self, title: &str) -> Result<FireOutcome, SchedulerError> {
        if let Some(timer) = self.timers.lock().await.remove(title) {
            debug!(title = %title, "fired early, cancelling timer");
            timer.abort();
        }
        self.dispatch(title).await
    }

    async fn dispatch(&self, title: &str) -> Result<FireOutcome, SchedulerError> {
        let Some(entry) = self.store.find_today(title).await else {
            debug!(title = %title, "entry left the store before airing");
            return Ok(FireOutcome::Removed);
        };
        if entry.delayed {
            info!(title = %title, ep = entry.ep, "episode delayed, not notifying");
            return Ok(FireOutcome::Delayed);
        }
        if entry.registered.is_empty() {
            debug!(title = %title, "no subscribers");
            return Ok(FireOutcome::Dispatched(DispatchReport::default()));
        }

        let info = self
            .search
            .best_match(&entry.title)
            .await
            .map_err(|source| SchedulerError::Metadata {
                title: entry.title.clone(),
                source,
            })?;
        let image = match info.image_url() {
            "" => {
                debug!(title = %title, "no artwork, sending without image");
                Vec::new()
            }
            url => self.download(url).await?,
        };
        let logo = self.download(&self.reference_logo_url).await?;
        let message = build_notification(&entry, &info, image, logo);

        let mut report = DispatchReport::default();
        for jid in &entry.registered {
            match self.session.send_image(jid, &message).await {
                Ok(()) => report.sent.push(jid.clone()),
                Err(e) => {
                    warn!(title = %title, chat_id = %jid, error = %e, "notification failed");
                    report.failed.push((jid.clone(), e.to_string()));
                }
            }
        }

        info!(
            title = %title,
            ep = entry.ep,
            sent = report.sent.len(),
            failed = report.failed.len(),
            "episode notification dispatched"
        );
        Ok(FireOutcome::Dispatched(report))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SchedulerError> {
        self.media
            .fetch(url)
            .await
            .map_err(|source| SchedulerError::Media {
                url: url.to_string(),
                source,
            })
    }

    // ─────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────

    /// Titles that have been given a timer, sorted.
    pub async fn scheduled_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.scheduled.lock().await.iter().cloned().collect();
        titles.sort();
        titles
    }

    pub async fn is_scheduled(&self, title: &str) -> bool {
        self.scheduled.lock().await.contains(title)
    }

    /// Number of timers still waiting to fire.
    pub async fn armed_count(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Forget titles whose timers already fired, so a reloaded store can arm them again.
    ///
    /// Titles with a timer still armed stay marked. Returns how many were cleared.
    pub async fn clear_scheduled(&self) -> usize {
        let timers = self.timers.lock().await;
        let mut scheduled = self.scheduled.lock().await;
        let before = scheduled.len();
        scheduled.retain(|title| timers.contains_key(title));
        let cleared = before - scheduled.len();
        debug!(cleared, kept = scheduled.len(), "cleared scheduled markers");
        cleared
    }

    // ─────────────────────────────────────────
    // Loop
    // ─────────────────────────────────────────

    /// Run a pass now and then every `interval`, until [`shutdown`](Self::shutdown).
    pub async fn run(self: &Arc<Self>, interval: Duration) {
        info!(interval_secs = interval.as_secs(), "episode scheduler started");
        while !self.stopped.load(Ordering::SeqCst) {
            let armed = self.schedule_pass().await;
            debug!(armed, "scheduling pass done");

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown.notified() => break,
            }
        }
        info!("episode scheduler stopped");
    }

    /// Stop the loop and abort every armed timer. Returns how many were aborted.
    pub async fn shutdown(&self) -> usize {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();

        let mut timers = self.timers.lock().await;
        let aborted = timers.len();
        for (title, task) in timers.drain() {
            debug!(title = %title, "aborting timer");
            task.abort();
        }
        if aborted > 0 {
            info!(aborted, "armed timers aborted");
        }
        aborted
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
