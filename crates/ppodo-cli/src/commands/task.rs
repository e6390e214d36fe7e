//! Task management commands for CLI.

use clap::Subcommand;
use ppodo_core::TaskFilter;
use serde_json::json;

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
    },
    /// List tasks, newest first
    List {
        /// all, completed (done) or incomplete (open)
        #[arg(long, default_value = "all")]
        filter: TaskFilter,
    },
    /// Mark a task completed and check for new badges
    Complete {
        /// Task ID
        id: i64,
    },
    /// Delete a task (its focus sessions are kept)
    Delete {
        /// Task ID
        id: i64,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let (db, _) = open()?;

    match action {
        TaskAction::Add { title } => {
            let id = db.add_task(&title)?;
            print_json(&db.get_task(id)?)?;
        }
        TaskAction::List { filter } => {
            print_json(&db.list_tasks(filter)?)?;
        }
        TaskAction::Complete { id } => {
            let changed = db.complete_task(id)?;
            let new_badges = if changed {
                db.evaluate_and_award()?
            } else {
                Vec::new()
            };
            print_json(&json!({
                "id": id,
                "changed": changed,
                "new_badges": new_badges,
            }))?;
        }
        TaskAction::Delete { id } => {
            let deleted = db.delete_task(id)?;
            print_json(&json!({ "id": id, "deleted": deleted }))?;
        }
    }
    Ok(())
}
