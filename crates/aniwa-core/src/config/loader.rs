//! Config loader — reads `~/.aniwa/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.aniwa/config.json`
//! 3. Environment variables `ANIWA_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `ANIWA_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `ANIWA_BOT__PREFIX` → `bot.prefix`
/// - `ANIWA_BOT__OWNER` → `bot.owner` (comma-separated)
/// - `ANIWA_BOT__SESSION_DIR` → `bot.session_dir`
/// - `ANIWA_WHATSAPP__BRIDGE_URL` → `whatsapp.bridge_url`
/// - `ANIWA_RECONNECT__MAX_ATTEMPTS` → `reconnect.max_attempts` (`0` = unbounded)
/// - `ANIWA_ANIME__API_BASE` → `anime.api_base`
/// - `ANIWA_ANIME__TODAY_FILE` → `anime.today_file`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("ANIWA_BOT__PREFIX") {
        config.bot.prefix = val;
    }
    if let Ok(val) = std::env::var("ANIWA_BOT__OWNER") {
        config.bot.owner = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Ok(val) = std::env::var("ANIWA_BOT__SESSION_DIR") {
        config.bot.session_dir = val;
    }

    if let Ok(val) = std::env::var("ANIWA_WHATSAPP__BRIDGE_URL") {
        config.whatsapp.bridge_url = val;
    }

    if let Ok(val) = std::env::var("ANIWA_RECONNECT__MAX_ATTEMPTS") {
        if let Ok(n) = val.parse::<u32>() {
            config.reconnect.max_attempts = if n == 0 { None } else { Some(n) };
        }
    }

    if let Ok(val) = std::env::var("ANIWA_ANIME__API_BASE") {
        config.anime.api_base = val;
    }
    if let Ok(val) = std::env::var("ANIWA_ANIME__TODAY_FILE") {
        config.anime.today_file = Some(val);
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
