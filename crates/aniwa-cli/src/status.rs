//! `aniwa status` — show configuration and session status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use aniwa_core::config::{get_config_path, load_config, Config};
use aniwa_core::session::store::CREDS_FILE;
use aniwa_core::store::AnimeStore;

use crate::helpers;

/// Run the status command.
pub async fn run() -> Result<()> {
    let config_path = get_config_path();
    let config = load_config(Some(&config_path));

    println!();
    println!("{}", "📺 Aniwa Status".cyan().bold());
    println!();

    row("Config:", &config_path.display().to_string(), Some(config_path.exists()));

    let session_dir = helpers::session_dir(&config);
    println!(
        "  {:<18} {} {}",
        "Session:".bold(),
        session_dir.display(),
        session_state(&session_dir)
    );

    row("Bridge:", &config.whatsapp.bridge_url, None);
    row("Protocol:", &protocol_label(&config), None);
    row("Reconnect:", &reconnect_label(&config).dimmed().to_string(), None);
    row(
        "Bot:",
        &format!("prefix \"{}\", {} owner(s)", config.bot.prefix, config.bot.owner.len()),
        None,
    );

    println!();
    match helpers::today_file(&config, None) {
        None => println!("  {:<18} {}", "Today file:".bold(), "(not set)".dimmed()),
        Some(path) if !path.exists() => {
            row("Today file:", &path.display().to_string(), Some(false))
        }
        Some(path) => {
            let store = AnimeStore::new();
            let summary = match store.load_today_file(&path).await {
                Ok(count) => format!("{count} title(s)").green().to_string(),
                Err(e) => format!("unreadable: {e}").red().to_string(),
            };
            println!("  {:<18} {} {}", "Today file:".bold(), path.display(), summary);
        }
    }
    row("Anime API:", &config.anime.api_base, None);
    println!();

    Ok(())
}

/// One `label value [✓ | (not found)]` row.
fn row(label: &str, value: &str, exists: Option<bool>) {
    let mark = match exists {
        Some(true) => "✓".green().to_string(),
        Some(false) => "(not found)".red().to_string(),
        None => String::new(),
    };
    println!("  {:<18} {} {}", label.bold(), value, mark);
}

fn session_state(dir: &Path) -> String {
    if dir.join(CREDS_FILE).exists() {
        "paired".green().to_string()
    } else if dir.exists() {
        "not paired".yellow().to_string()
    } else {
        "(not found)".red().to_string()
    }
}

fn protocol_label(config: &Config) -> String {
    match config.whatsapp.protocol_version {
        Some([a, b, c]) => format!("{a}.{b}.{c} (pinned)"),
        None => format!("latest from {}", config.whatsapp.version_url),
    }
}

fn reconnect_label(config: &Config) -> String {
    let r = &config.reconnect;
    let budget = match r.max_attempts {
        Some(n) => format!("{n} attempts"),
        None => "unbounded".to_string(),
    };
    format!(
        "{}ms → {}ms ×{}, {budget}, logout grace {}ms",
        r.initial_delay_ms, r.max_delay_ms, r.multiplier, r.logout_grace_ms
    )
}
