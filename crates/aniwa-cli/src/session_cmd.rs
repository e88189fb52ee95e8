//! `aniwa session` — manage the stored WhatsApp session.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use aniwa_core::config::load_config;
use aniwa_core::session::delete_session;

use crate::helpers::{self, StatusTag};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Delete the stored session; the next start pairs from scratch
    Reset,
}

pub async fn dispatch(action: SessionCommands) -> Result<()> {
    match action {
        SessionCommands::Reset => {
            let config = load_config(None);
            let dir = helpers::session_dir(&config);

            helpers::print_status(StatusTag::Session, &format!("Deleting session {}.", dir.display()));
            match reset(&dir).await? {
                Some(files) => {
                    helpers::print_status(StatusTag::Session, "Session deleted successfully.");
                    println!("  {}", format!("{files} file(s) removed").dimmed());
                }
                None => println!("  {}", "No session stored, nothing to do.".dimmed()),
            }
            Ok(())
        }
    }
}

/// Wipe `dir`. `None` when there is no session to wipe.
async fn reset(dir: &Path) -> Result<Option<usize>> {
    if !dir.exists() {
        return Ok(None);
    }
    let files = delete_session(dir)
        .await
        .with_context(|| format!("failed to delete session {}", dir.display()))?;
    Ok(Some(files))
}
