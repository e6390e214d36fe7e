use clap::Subcommand;

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum BadgeAction {
    /// All badges with their earned status
    List,
    /// Award every badge that is due and print the new ones
    Check,
}

pub fn run(action: BadgeAction) -> CliResult {
    let (db, _) = open()?;

    match action {
        BadgeAction::List => print_json(&db.get_all_badges_with_status()?),
        BadgeAction::Check => print_json(&db.evaluate_and_award()?),
    }
}
