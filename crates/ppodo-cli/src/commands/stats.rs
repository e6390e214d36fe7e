use clap::Subcommand;

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's grapes, sessions and focus minutes
    Today,
    /// Focus minutes per day, oldest first
    Weekly {
        /// Number of days, today included
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Today's focus minutes per task
    Distribution,
}

pub fn run(action: StatsAction) -> CliResult {
    let (db, _) = open()?;

    match action {
        StatsAction::Today => print_json(&db.get_today_stats()?),
        StatsAction::Weekly { days } => print_json(&db.get_weekly_focus_minutes(days)?),
        StatsAction::Distribution => print_json(&db.get_today_task_distribution()?),
    }
}
