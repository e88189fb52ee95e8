//! Shared CLI helpers — path resolution, banner, connection status lines.

use std::path::{Path, PathBuf};

use colored::{ColoredString, Colorize};

use aniwa_core::bus::ClientEvent;
use aniwa_core::config::Config;
use aniwa_core::utils::{expand_home, get_data_path, resolve_session_dir};

/// Session directory of the loaded config.
pub fn session_dir(config: &Config) -> PathBuf {
    resolve_session_dir(&config.bot.session_dir, &get_data_path())
}

/// Today file: the command-line override, else `anime.todayFile`.
pub fn today_file(config: &Config, override_path: Option<&str>) -> Option<PathBuf> {
    override_path
        .or(config.anime.today_file.as_deref())
        .map(expand_home)
}

/// Print the banner shown before a long-running command.
pub fn print_banner(mode: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "📺 Aniwa".cyan().bold(), version.dimmed());
    println!("  Mode: {mode}");
    println!();
}

// ─────────────────────────────────────────────
// Status lines
// ─────────────────────────────────────────────

/// Tag in front of a lifecycle status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTag {
    Qr,
    Connection,
    Session,
}

impl StatusTag {
    fn paint(self) -> ColoredString {
        match self {
            StatusTag::Qr => "[QR]".bright_blue(),
            StatusTag::Connection => "[CONNECTION]".bright_green(),
            StatusTag::Session => "[SESSION]".bright_yellow(),
        }
    }
}

/// Human-readable lines for a client event. Inbound traffic has none.
pub fn status_lines(event: &ClientEvent, session_dir: &Path) -> Vec<(StatusTag, String)> {
    match event {
        ClientEvent::Qr(_) => vec![(
            StatusTag::Qr,
            "Scan the QR code from the terminal to connect your WhatsApp device.".to_string(),
        )],
        ClientEvent::Connecting => {
            vec![(StatusTag::Connection, "Connecting to WhatsApp...".to_string())]
        }
        ClientEvent::Open => vec![(StatusTag::Connection, "Connected to the WhatsApp.".to_string())],
        ClientEvent::LoggedOut => vec![
            (
                StatusTag::Connection,
                "You've been logged out of this session.".to_string(),
            ),
            (
                StatusTag::Session,
                format!("Deleting session {}.", session_dir.display()),
            ),
        ],
        ClientEvent::SessionDeleted => {
            vec![(StatusTag::Session, "Session deleted successfully.".to_string())]
        }
        ClientEvent::NewCall(_) | ClientEvent::NewMessage(_) => Vec::new(),
    }
}

pub fn print_status(tag: StatusTag, message: &str) {
    println!("{} - {}", tag.paint(), message);
}

/// `"in 1h 05m"`, `"in 42s"`, `"12m 03s ago"`.
pub fn format_delay(delay_ms: i64) -> String {
    let secs = delay_ms.unsigned_abs() / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let span = if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    };
    if delay_ms >= 0 {
        format!("in {span}")
    } else {
        format!("{span} ago")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
