//! Focus session commands that bypass the timer, for callers that keep
//! time themselves.

use clap::Subcommand;
use ppodo_core::{qualifies_for_reward, CompletionReport, Database, StateError};
use serde_json::json;

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Open a focus session
    Start {
        /// Task the session is spent on
        #[arg(long)]
        task: Option<i64>,
        /// Planned length (default: timer.focus_minutes)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Finish a session; sessions of 15 minutes or more collect a grape
    Complete {
        /// Session ID (default: the open session)
        id: Option<i64>,
    },
    /// Finish a session early without a reward
    Abandon {
        /// Session ID (default: the open session)
        id: Option<i64>,
    },
    /// Print the open session, or null
    Status,
}

fn resolve(db: &Database, id: Option<i64>) -> Result<i64, Box<dyn std::error::Error>> {
    match id {
        Some(id) => Ok(id),
        None => db
            .open_session()?
            .map(|s| s.id)
            .ok_or_else(|| StateError::NoActiveSession.into()),
    }
}

pub fn run(action: SessionAction) -> CliResult {
    let (db, config) = open()?;

    match action {
        SessionAction::Start { task, minutes } => {
            let minutes = minutes.unwrap_or(config.timer.focus_minutes);
            let id = db.start_session(task, minutes)?;
            print_json(&db.get_session(id)?)?;
        }
        SessionAction::Complete { id } => {
            let id = resolve(&db, id)?;
            let collect = qualifies_for_reward(db.get_session(id)?.duration_minutes);
            match db.complete_session(id, collect)? {
                Some(outcome) => {
                    let new_badges = if outcome.reward.is_some() {
                        db.evaluate_and_award()?
                    } else {
                        Vec::new()
                    };
                    print_json(&CompletionReport {
                        session: outcome.session,
                        reward: outcome.reward,
                        new_badges,
                    })?;
                }
                None => print_json(&json!({ "id": id, "finalized": false }))?,
            }
        }
        SessionAction::Abandon { id } => {
            let id = resolve(&db, id)?;
            match db.complete_session(id, false)? {
                Some(outcome) => print_json(&outcome)?,
                None => print_json(&json!({ "id": id, "finalized": false }))?,
            }
        }
        SessionAction::Status => {
            print_json(&db.open_session()?)?;
        }
    }
    Ok(())
}
