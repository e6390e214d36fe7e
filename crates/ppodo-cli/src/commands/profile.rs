use super::{open, print_json, CliResult};

/// Print the profile snapshot: grapes and tiers, level progress, streak.
pub fn run() -> CliResult {
    let (db, _) = open()?;
    print_json(&db.get_profile_snapshot()?)
}
