pub mod badge;
pub mod config;
pub mod profile;
pub mod session;
pub mod stats;
pub mod task;
pub mod timer;

use ppodo_core::{Config, Database};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the database with the configured ledger tiers.
pub fn open() -> Result<(Database, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?.with_extended_tiers(config.progress.extended_tiers);
    tracing::debug!(
        extended_tiers = config.progress.extended_tiers,
        "database opened"
    );
    Ok((db, config))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
