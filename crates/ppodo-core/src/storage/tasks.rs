//! Task ledger: create, list, complete and delete tasks.

use chrono::{DateTime, Local};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::{format_time, get_opt_time, get_time, Database};
use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
}

/// Which tasks [`Database::list_tasks`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

impl std::str::FromStr for TaskFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(TaskFilter::All),
            "completed" | "done" => Ok(TaskFilter::Completed),
            "incomplete" | "open" => Ok(TaskFilter::Incomplete),
            other => Err(ValidationError::InvalidValue {
                field: "filter".into(),
                message: format!("unknown task filter '{other}'"),
            }),
        }
    }
}

const TASK_COLUMNS: &str = "id, title, completed, created_at, completed_at";

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        completed: row.get(2)?,
        created_at: get_time(row, 3)?,
        completed_at: get_opt_time(row, 4)?,
    })
}

impl Database {
    /// Create a task and return its id.
    ///
    /// # Errors
    /// `ValidationError::EmptyTitle` if the title is empty or whitespace.
    pub fn add_task(&self, title: &str) -> Result<i64> {
        self.add_task_at(title, Local::now())
    }

    pub fn add_task_at(&self, title: &str, now: DateTime<Local>) -> Result<i64> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        self.conn().execute(
            "INSERT INTO tasks (title, completed, created_at) VALUES (?1, 0, ?2)",
            params![title, format_time(&now)],
        )?;
        let id = self.conn().last_insert_rowid();
        tracing::debug!(id, title, "task added");
        Ok(id)
    }

    /// List tasks, newest created first.
    pub fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let condition = match filter {
            TaskFilter::All => "",
            TaskFilter::Completed => "WHERE completed = 1",
            TaskFilter::Incomplete => "WHERE completed = 0",
        };
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks {condition} ORDER BY id DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Look up a task that is expected to exist.
    ///
    /// # Errors
    /// `CoreError::NotFound` for an unknown id.
    pub fn get_task(&self, id: i64) -> Result<Task> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        self.conn()
            .query_row(&sql, params![id], row_to_task)
            .optional()?
            .ok_or(CoreError::NotFound { kind: "task", id })
    }

    /// Mark a task completed.
    ///
    /// Unknown ids and already-completed tasks are a no-op; returns whether
    /// anything changed.
    pub fn complete_task(&self, id: i64) -> Result<bool> {
        self.complete_task_at(id, Local::now())
    }

    pub fn complete_task_at(&self, id: i64, now: DateTime<Local>) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE tasks SET completed = 1, completed_at = ?2
             WHERE id = ?1 AND completed = 0",
            params![id, format_time(&now)],
        )?;
        if changed > 0 {
            tracing::debug!(id, "task completed");
        }
        Ok(changed > 0)
    }

    /// Delete a task. Focus sessions keep their (now dangling) task reference.
    ///
    /// Unknown ids are a no-op; returns whether a row was removed.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn add_rejects_blank_titles() {
        let db = Database::open_memory().unwrap();
        for title in ["", "   ", "\t\n"] {
            let err = db.add_task(title).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::EmptyTitle)
            ));
        }
        assert!(db.list_tasks(TaskFilter::All).unwrap().is_empty());
    }

    #[test]
    fn add_and_get_task() {
        let db = Database::open_memory().unwrap();
        let id = db.add_task("  Write report ").unwrap();
        let task = db.get_task(id).unwrap();
        assert_eq!(task.title, "Write report");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn get_unknown_task_is_not_found() {
        let db = Database::open_memory().unwrap();
        let err = db.get_task(99).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "task", id: 99 }));
    }

    #[test]
    fn list_is_newest_first_and_filtered() {
        let db = Database::open_memory().unwrap();
        let base = Local::now();
        let a = db.add_task_at("a", base).unwrap();
        let b = db.add_task_at("b", base + Duration::minutes(1)).unwrap();
        let c = db.add_task_at("c", base + Duration::minutes(2)).unwrap();
        db.complete_task(b).unwrap();

        let all: Vec<i64> = db
            .list_tasks(TaskFilter::All)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(all, vec![c, b, a]);

        let done: Vec<i64> = db
            .list_tasks(TaskFilter::Completed)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(done, vec![b]);

        let open: Vec<i64> = db
            .list_tasks(TaskFilter::Incomplete)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(open, vec![c, a]);
    }

    #[test]
    fn list_order_follows_creation_across_offset_change() {
        let db = Database::open_memory().unwrap();
        // The second task is created 40 minutes later, after clocks fell back,
        // so its stored text sorts before the first one's.
        for (title, created_at) in [
            ("before", "2026-10-25T02:30:00+02:00"),
            ("after", "2026-10-25T02:10:00+01:00"),
        ] {
            db.conn()
                .execute(
                    "INSERT INTO tasks (title, completed, created_at) VALUES (?1, 0, ?2)",
                    params![title, created_at],
                )
                .unwrap();
        }
        let titles: Vec<String> = db
            .list_tasks(TaskFilter::All)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["after", "before"]);
    }

    #[test]
    fn complete_is_idempotent() {
        let db = Database::open_memory().unwrap();
        let id = db.add_task("t").unwrap();
        let first = Local::now();
        assert!(db.complete_task_at(id, first).unwrap());
        assert!(!db.complete_task_at(id, first + Duration::hours(1)).unwrap());
        assert!(!db.complete_task(12345).unwrap());

        let task = db.get_task(id).unwrap();
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(first));
        assert_eq!(db.badge_context_at(first).unwrap().tasks_completed, 1);
    }

    #[test]
    fn delete_removes_task_and_tolerates_unknown_ids() {
        let db = Database::open_memory().unwrap();
        let id = db.add_task("t").unwrap();
        assert!(db.delete_task(id).unwrap());
        assert!(!db.delete_task(id).unwrap());
        assert!(db.list_tasks(TaskFilter::All).unwrap().is_empty());
    }

    #[test]
    fn filter_parses_from_cli_words() {
        assert_eq!("all".parse::<TaskFilter>().unwrap(), TaskFilter::All);
        assert_eq!("done".parse::<TaskFilter>().unwrap(), TaskFilter::Completed);
        assert_eq!("incomplete".parse::<TaskFilter>().unwrap(), TaskFilter::Incomplete);
        assert!("bogus".parse::<TaskFilter>().is_err());
    }
}
