//! `aniwa schedule` — inspect today's schedule without connecting.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use colored::Colorize;

use aniwa_core::config::load_config;
use aniwa_core::store::AnimeStore;
use aniwa_scheduler::{preview, AiringPreview};

use crate::helpers;

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Show when each of today's titles would fire
    Preview {
        /// JSON file with today's tracked anime (overrides anime.todayFile)
        #[arg(long, value_name = "FILE")]
        today: Option<String>,

        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },
}

pub async fn dispatch(action: ScheduleCommands) -> Result<()> {
    match action {
        ScheduleCommands::Preview { today, at } => {
            let config = load_config(None);
            let Some(path) = helpers::today_file(&config, today.as_deref()) else {
                bail!("no today file: pass --today FILE or set anime.todayFile");
            };
            let now = match at {
                Some(raw) => parse_instant(&raw)?,
                None => Utc::now(),
            };

            let store = AnimeStore::new();
            store
                .load_today_file(&path)
                .await
                .with_context(|| format!("failed to load today file {}", path.display()))?;
            let rows = preview(&store.today().await.unwrap_or_default(), now);

            println!();
            println!(
                "{}  {}",
                "📺 Today's schedule".cyan().bold(),
                format!("as of {}", now.with_timezone(&Local).format("%Y-%m-%d %H:%M")).dimmed()
            );
            println!();
            if rows.is_empty() {
                println!("  {}", "Nothing airing today.".dimmed());
            }
            for row in &rows {
                let line = format_row(row);
                if row.error.is_some() {
                    println!("  {}", line.red());
                } else if row.is_upcoming() {
                    println!("  {}", line.green());
                } else {
                    println!("  {}", line.dimmed());
                }
            }
            println!();
            Ok(())
        }
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid RFC 3339 time \"{raw}\""))?;
    Ok(parsed.with_timezone(&Utc))
}

/// `Title  ep 5  09:05 +9  → 2024-05-01 00:05 UTC (in 5m 00s)`
fn format_row(row: &AiringPreview) -> String {
    let slot = format!(
        "{} {}",
        row.time.as_deref().unwrap_or("--:--"),
        row.timezone
    );
    let head = format!("{:<32} ep {:<4} {:<16}", row.title, row.ep, slot);

    match (&row.instant, row.delay_ms, &row.error) {
        (_, _, Some(err)) => format!("{head} ✗ {err}"),
        (Some(at), Some(delay), None) => {
            let verdict = if delay >= 0 { "" } else { ", skipped" };
            format!(
                "{head} → {} ({}{verdict})",
                at.format("%Y-%m-%d %H:%M UTC"),
                helpers::format_delay(delay)
            )
        }
        _ => head,
    }
}
