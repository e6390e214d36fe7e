mod badges;
mod config;
pub mod database;
pub mod migrations;
mod profile;
mod sessions;
mod stats;
mod tasks;

pub use config::{Config, ProgressConfig, TimerConfig, UiConfig, SUPPORTED_LANGUAGES};
pub use database::Database;
pub use sessions::{FocusSession, SessionOutcome};
pub use stats::{DailyFocus, DailyStat, ProfileSnapshot, TaskFocus, TodayStats};
pub use tasks::{Task, TaskFilter};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory for the database and config file.
///
/// `PPODO_HOME` overrides the location entirely. Otherwise this is
/// `~/.config/ppodo/`, or `~/.config/ppodo-dev/` when `PPODO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("PPODO_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PPODO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("ppodo-dev")
            } else {
                base_dir.join("ppodo")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
