//! Configuration schema.
//!
//! Hierarchy: `Config` → `BotConfig`, `WhatsAppConfig`, `ReconnectConfig`, `AnimeConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};

/// Where the latest WhatsApp Web protocol version is published.
pub const DEFAULT_VERSION_URL: &str =
    "https://raw.githubusercontent.com/WhiskeySockets/Baileys/master/src/Defaults/baileys-version.json";

/// Public Jikan (MyAnimeList) API.
pub const DEFAULT_ANIME_API_BASE: &str = "https://api.jikan.moe/v4";

/// Logo shown on the reference card of episode notifications.
pub const DEFAULT_REFERENCE_LOGO_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/7/7a/MyAnimeList_Logo.png";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.aniwa/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub bot: BotConfig,
    pub whatsapp: WhatsAppConfig,
    pub reconnect: ReconnectConfig,
    pub anime: AnimeConfig,
}

// ─────────────────────────────────────────────
// Bot
// ─────────────────────────────────────────────

/// Bot identity: command prefix, privileged users, session location.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
    /// Command prefix, e.g. `"!"`.
    pub prefix: String,
    /// Privileged user identifiers (phone numbers or JIDs).
    pub owner: Vec<String>,
    /// Directory holding the WhatsApp credential and key files.
    pub session_dir: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            owner: Vec::new(),
            session_dir: "auth".to_string(),
        }
    }
}

impl BotConfig {
    /// Whether a sender JID (or bare number) belongs to an owner.
    pub fn is_owner(&self, sender: &str) -> bool {
        let number = sender.split('@').next().unwrap_or(sender);
        let number = number.split(':').next().unwrap_or(number);
        self.owner
            .iter()
            .any(|o| o == sender || o.split('@').next() == Some(number))
    }
}

// ─────────────────────────────────────────────
// WhatsApp
// ─────────────────────────────────────────────

/// WhatsApp transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhatsAppConfig {
    /// Baileys bridge WebSocket URL.
    pub bridge_url: String,
    /// Ask the bridge to render pairing QR codes in its terminal.
    pub print_qr: bool,
    /// How long a pairing QR code stays valid.
    pub qr_timeout_ms: u64,
    /// Where to look up the latest protocol version.
    pub version_url: String,
    /// Pin a protocol version instead of looking it up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<[u32; 3]>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            bridge_url: "ws://localhost:3001".to_string(),
            print_qr: true,
            qr_timeout_ms: 60_000,
            version_url: DEFAULT_VERSION_URL.to_string(),
            protocol_version: None,
        }
    }
}

// ─────────────────────────────────────────────
// Reconnect
// ─────────────────────────────────────────────

/// Reconnect backoff and logout handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt.
    pub initial_delay_ms: u64,
    /// Upper bound for any single reconnect delay.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive attempts.
    pub multiplier: f64,
    /// Consecutive failed attempts allowed before giving up. `None` = unbounded.
    pub max_attempts: Option<u32>,
    /// Grace period after a logout before the session is wiped.
    pub logout_grace_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            max_attempts: Some(10),
            logout_grace_ms: 3_000,
        }
    }
}

// ─────────────────────────────────────────────
// Anime
// ─────────────────────────────────────────────

/// Episode notifier settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimeConfig {
    /// Anime metadata API base URL.
    pub api_base: String,
    /// Thumbnail of the reference card.
    pub reference_logo_url: String,
    /// JSON file with today's tracked entries, loaded into the today store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_file: Option<String>,
    /// Seconds between scheduler passes.
    pub refresh_interval_secs: u64,
}

impl Default for AnimeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_ANIME_API_BASE.to_string(),
            reference_logo_url: DEFAULT_REFERENCE_LOGO_URL.to_string(),
            today_file: None,
            refresh_interval_secs: 300,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
