//! `aniwa start` — keeps the WhatsApp session alive and runs the episode notifier.
//!
//! Startup sequence:
//! 1. Load config, resolve the session directory
//! 2. Create the event bus, session store, bridge factory and connection manager
//! 3. Load the today store and create the episode scheduler on the manager's session handle
//! 4. Spawn the event printer (status lines, a scheduler pass on every `open`)
//! 5. Run: `tokio::select!` of connection manager + scheduler loop + today-file watcher
//! 6. Handle Ctrl+C for graceful shutdown

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use aniwa_channels::{BridgeFactory, ConnectionManager, ReconnectPolicy, VersionSource};
use aniwa_core::bus::{ClientEvent, EventBus};
use aniwa_core::config::{load_config, BotConfig};
use aniwa_core::session::SessionStore;
use aniwa_core::store::AnimeStore;
use aniwa_providers::{HttpFetcher, JikanClient};
use aniwa_scheduler::EpisodeScheduler;

use crate::helpers;
use crate::inbound::parse_invocation;

/// Run the bot until Ctrl+C, a retry budget runs out, or a session reset fails.
pub async fn run(today_override: Option<String>) -> Result<()> {
    helpers::print_banner("Start");

    // 1. Config
    let config = load_config(None);
    let session_dir = helpers::session_dir(&config);
    let today_path = helpers::today_file(&config, today_override.as_deref());

    // 2. Connection
    let bus = EventBus::new(128);
    let factory = Arc::new(BridgeFactory::from_config(&config.whatsapp));
    let manager = Arc::new(
        ConnectionManager::new(
            factory,
            SessionStore::new(&session_dir),
            bus.clone(),
            ReconnectPolicy::from(&config.reconnect),
            VersionSource::from_config(&config),
        )
        .with_logout_grace(Duration::from_millis(config.reconnect.logout_grace_ms)),
    );

    // 3. Today store + scheduler
    let store = Arc::new(AnimeStore::new());
    if let Some(path) = &today_path {
        store
            .load_today_file(path)
            .await
            .with_context(|| format!("failed to load today file {}", path.display()))?;
    }
    let search = Arc::new(
        JikanClient::new(&config.anime.api_base).context("failed to build anime search client")?,
    );
    let media = Arc::new(HttpFetcher::new().context("failed to build media client")?);
    let scheduler = Arc::new(EpisodeScheduler::new(
        store.clone(),
        manager.handle(),
        search,
        media,
        config.anime.reference_logo_url.clone(),
    ));

    let tracked = store.today().await.map_or(0, |t| t.len());
    println!("  Bridge:   {}", config.whatsapp.bridge_url);
    println!("  Session:  {}", session_dir.display());
    println!("  Tracked:  {tracked} title(s) airing today");
    println!();

    // 4. Event printer
    let printer = tokio::spawn(print_events(
        bus.subscribe(),
        scheduler.clone(),
        config.bot.clone(),
        session_dir.clone(),
    ));

    // 5. Run
    let interval = Duration::from_secs(config.anime.refresh_interval_secs.max(1));
    let result = tokio::select! {
        result = manager.run() => {
            result.context("connection manager stopped")
        }
        _ = scheduler.run(interval) => {
            Ok(())
        }
        _ = watch_today_file(today_path.clone(), store.clone(), scheduler.clone(), interval) => {
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Shutting down...");
            Ok(())
        }
    };

    // 6. Shutdown
    manager.shutdown().await;
    let aborted = scheduler.shutdown().await;
    printer.abort();
    info!(aborted, "aniwa stopped");

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "aniwa exited with an error");
    }
    result
}

// ─────────────────────────────────────────────
// Event printer
// ─────────────────────────────────────────────

async fn print_events(
    mut rx: broadcast::Receiver<ClientEvent>,
    scheduler: Arc<EpisodeScheduler>,
    bot: BotConfig,
    session_dir: PathBuf,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event printer lagged behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        for (tag, line) in helpers::status_lines(&event, &session_dir) {
            helpers::print_status(tag, &line);
        }

        match event {
            ClientEvent::Open => {
                let armed = scheduler.schedule_pass().await;
                info!(armed, "scheduling pass after connect");
            }
            ClientEvent::NewMessage(msg) => match parse_invocation(&msg, &bot) {
                Some(inv) => info!(
                    command = %inv.command,
                    args = inv.args.len(),
                    chat_id = %inv.chat_id,
                    sender = %inv.sender,
                    owner = inv.from_owner,
                    "command received"
                ),
                None => debug!(chat_id = msg.chat_id().unwrap_or("?"), "message received"),
            },
            ClientEvent::NewCall(call) => {
                info!(from = %call.from, status = ?call.status, video = call.is_video, "incoming call");
            }
            _ => {}
        }
    }
}

// ─────────────────────────────────────────────
// Today-file watcher
// ─────────────────────────────────────────────

/// Reload the today file whenever it changes on disk.
///
/// A reload is the day rollover: titles whose timers already fired may be armed again.
async fn watch_today_file(
    path: Option<PathBuf>,
    store: Arc<AnimeStore>,
    scheduler: Arc<EpisodeScheduler>,
    interval: Duration,
) {
    let Some(path) = path else {
        return std::future::pending::<()>().await;
    };

    let mut last_seen = modified_at(&path).await;
    loop {
        tokio::time::sleep(interval).await;

        let modified = modified_at(&path).await;
        if modified.is_none() || modified == last_seen {
            continue;
        }

        match reload_today(&path, &store, &scheduler, Utc::now()).await {
            Ok(reload) => {
                last_seen = modified;
                info!(
                    count = reload.loaded,
                    cleared = reload.cleared,
                    armed = reload.armed,
                    "today file reloaded"
                );
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to reload today file"),
        }
    }
}

/// Counts from one [`reload_today`].
#[derive(Debug, PartialEq, Eq)]
struct Reload {
    loaded: usize,
    cleared: usize,
    armed: usize,
}

/// Load the today file, forget fired titles, and run a pass as of `now`.
///
/// The store is left untouched when the file can't be read.
async fn reload_today(
    path: &Path,
    store: &AnimeStore,
    scheduler: &Arc<EpisodeScheduler>,
    now: DateTime<Utc>,
) -> Result<Reload> {
    let loaded = store.load_today_file(path).await?;
    let cleared = scheduler.clear_scheduled().await;
    let armed = scheduler.schedule_at(now).await;
    Ok(Reload {
        loaded,
        cleared,
        armed,
    })
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use aniwa_channels::SessionHandle;
    use aniwa_core::types::TrackedAnime;

    #[tokio::test]
    async fn test_modified_at() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("today.json");
        assert!(modified_at(&path).await.is_none());

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"[]").unwrap();
        assert!(modified_at(&path).await.is_some());
    }

    fn write_today(path: &Path, title: &str, ep: u32, time: &str) {
        let anime = vec![TrackedAnime::new(title, ep, time, "+9")];
        std::fs::write(path, serde_json::to_string(&anime).unwrap()).unwrap();
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_rearms_fired_title_on_a_later_day() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("today.json");

        let store = Arc::new(AnimeStore::new());
        let scheduler = Arc::new(EpisodeScheduler::new(
            store.clone(),
            SessionHandle::new(),
            Arc::new(JikanClient::new("http://127.0.0.1:9").unwrap()),
            Arc::new(HttpFetcher::new().unwrap()),
            "http://127.0.0.1:9/logo.png",
        ));

        // Day one: 09:05 in +9 is five minutes after 00:00 UTC. No subscribers, so no network.
        write_today(&path, "X", 5, "9:5");
        let day_one = utc("2024-05-01T00:00:00Z");
        let reload = reload_today(&path, &store, &scheduler, day_one).await.unwrap();
        assert_eq!(reload, Reload { loaded: 1, cleared: 0, armed: 1 });

        tokio::time::sleep(Duration::from_secs(301)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(scheduler.armed_count().await, 0);
        assert!(scheduler.is_scheduled("X").await);

        // Same day, same file: the fired title is not armed twice.
        assert_eq!(scheduler.schedule_at(day_one).await, 0);

        // Day two: the file now lists the next episode.
        write_today(&path, "X", 6, "10:00");
        let day_two = utc("2024-05-02T00:00:00Z");
        let reload = reload_today(&path, &store, &scheduler, day_two).await.unwrap();
        assert_eq!(reload, Reload { loaded: 1, cleared: 1, armed: 1 });
        assert_eq!(scheduler.armed_count().await, 1);
        assert_eq!(store.find_today("X").await.unwrap().ep, 6);

        // While the new timer is armed, the title stays marked and can't be doubled.
        assert_eq!(scheduler.clear_scheduled().await, 0);
        assert_eq!(scheduler.schedule_at(day_two).await, 0);
        assert_eq!(scheduler.armed_count().await, 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_reload_keeps_store_on_unreadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("today.json");
        std::fs::write(&path, "not json").unwrap();

        let store = Arc::new(AnimeStore::new());
        store.set_today(vec![TrackedAnime::new("Kept", 1, "9:5", "+9")]).await;
        let scheduler = Arc::new(EpisodeScheduler::new(
            store.clone(),
            SessionHandle::new(),
            Arc::new(JikanClient::new("http://127.0.0.1:9").unwrap()),
            Arc::new(HttpFetcher::new().unwrap()),
            "http://127.0.0.1:9/logo.png",
        ));

        assert!(reload_today(&path, &store, &scheduler, utc("2024-05-01T00:00:00Z")).await.is_err());
        assert!(store.find_today("Kept").await.is_some());
    }
}
