//! `aniwa onboard` — initialize configuration and the today file.
//!
//! - Creates `~/.aniwa/config.json` with defaults
//! - Creates an empty `~/.aniwa/today.json` and points `anime.todayFile` at it

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use aniwa_core::config::{save_config, Config};
use aniwa_core::types::TrackedAnime;
use aniwa_core::utils::get_data_path;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "📺 Aniwa — Setup".cyan().bold());
    println!();

    let data_dir = get_data_path();
    let created = onboard_in(&data_dir)?;

    let config_path = data_dir.join("config.json");
    let verb = if created.config { "created" } else { "found existing" };
    println!("  {} {verb} config at {}", "✓".green(), config_path.display());

    let today_path = data_dir.join(TODAY_FILE);
    if created.today {
        println!("  {} created today file at {}", "✓".green(), today_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("    1. Start the Baileys bridge (default {})", "ws://localhost:3001".dimmed());
    println!("    2. List today's titles in {}", today_path.display());
    println!("    3. Run {} and scan the QR code", "aniwa start".bold());
    println!();
    Ok(())
}

const TODAY_FILE: &str = "today.json";

/// What [`onboard_in`] had to create.
#[derive(Debug, Default, PartialEq)]
struct Created {
    config: bool,
    today: bool,
}

/// Create the config and today file under `data_dir`, leaving existing ones alone.
fn onboard_in(data_dir: &Path) -> Result<Created> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let config_path = data_dir.join("config.json");
    let today_path = data_dir.join(TODAY_FILE);
    let mut created = Created::default();

    if !config_path.exists() {
        let mut config = Config::default();
        config.anime.today_file = Some(today_path.display().to_string());
        save_config(&config, Some(&config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        created.config = true;
    }

    if !today_path.exists() {
        let empty: Vec<TrackedAnime> = Vec::new();
        std::fs::write(&today_path, serde_json::to_string_pretty(&empty)?)
            .with_context(|| format!("failed to write {}", today_path.display()))?;
        created.today = true;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniwa_core::config::load_config;

    #[test]
    fn test_onboard_creates_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path().join(".aniwa");

        let created = onboard_in(&data_dir).unwrap();
        assert_eq!(created, Created { config: true, today: true });

        let config = load_config(Some(&data_dir.join("config.json")));
        let today = data_dir.join("today.json");
        assert_eq!(config.anime.today_file, Some(today.display().to_string()));
        assert_eq!(std::fs::read_to_string(&today).unwrap(), "[]");
    }

    #[test]
    fn test_onboard_keeps_existing_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path();
        std::fs::write(data_dir.join("config.json"), r#"{"bot":{"prefix":"."}}"#).unwrap();
        std::fs::write(data_dir.join("today.json"), "[]").unwrap();

        let created = onboard_in(data_dir).unwrap();
        assert_eq!(created, Created::default());

        let raw = std::fs::read_to_string(data_dir.join("config.json")).unwrap();
        assert_eq!(raw, r#"{"bot":{"prefix":"."}}"#);
    }
}
