//! Focus session lifecycle and the atomic reward transaction.
//!
//! At most one session is open (no `ended_at`) at a time. Finalizing a
//! session is terminal. When the caller asks to collect a reward, the grape
//! ledger, experience, streak and today's daily stats are updated in the
//! same transaction as the session row, so either every effect commits or
//! none does.

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::{format_date, format_time, get_opt_time, get_time, Database};
use super::profile::{load_profile, save_profile};
use crate::error::{CoreError, Result, StateError, ValidationError};
use crate::progress::{HarvestOutcome, RewardOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: i64,
    /// May point at a task that has since been deleted.
    pub task_id: Option<i64>,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    /// Planned focus length.
    pub duration_minutes: u32,
    /// Minutes actually spent focusing, set on finalization.
    pub focused_minutes: u32,
    pub completed: bool,
    /// Whether finalizing this session collected a grape.
    pub rewarded: bool,
}

impl FocusSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Result of finalizing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session: FocusSession,
    /// Present only when a reward was collected.
    pub reward: Option<RewardOutcome>,
}

const SESSION_COLUMNS: &str =
    "id, task_id, started_at, ended_at, duration_minutes, focused_minutes, completed, rewarded";

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<FocusSession> {
    Ok(FocusSession {
        id: row.get(0)?,
        task_id: row.get(1)?,
        started_at: get_time(row, 2)?,
        ended_at: get_opt_time(row, 3)?,
        duration_minutes: row.get(4)?,
        focused_minutes: row.get(5)?,
        completed: row.get(6)?,
        rewarded: row.get(7)?,
    })
}

fn load_session(conn: &Connection, id: i64) -> rusqlite::Result<Option<FocusSession>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM focus_sessions WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_session).optional()
}

/// Add one grape (and any rolled-over tiers) to the daily row for `date`.
fn record_daily_harvest(
    conn: &Connection,
    date: NaiveDate,
    harvest: &HarvestOutcome,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO daily_stats (date, grapes_earned, bunches_completed, boxes_completed)
         VALUES (?1, 1, ?2, ?3)
         ON CONFLICT(date) DO UPDATE SET
            grapes_earned = grapes_earned + 1,
            bunches_completed = bunches_completed + excluded.bunches_completed,
            boxes_completed = boxes_completed + excluded.boxes_completed",
        params![format_date(date), harvest.bunches(), harvest.boxes()],
    )?;
    Ok(())
}

/// Whole minutes between `started_at` and `now`, capped at `planned`.
fn elapsed_minutes(started_at: &DateTime<Local>, now: &DateTime<Local>, planned: u32) -> u32 {
    let minutes = (*now - *started_at).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX).min(planned)
}

impl Database {
    /// Open a focus session and return its id.
    ///
    /// # Errors
    /// `StateError::SessionAlreadyOpen` if another session has not been
    /// finalized; `ValidationError` for a zero duration.
    pub fn start_session(&self, task_id: Option<i64>, duration_minutes: u32) -> Result<i64> {
        self.start_session_at(task_id, duration_minutes, Local::now())
    }

    pub fn start_session_at(
        &self,
        task_id: Option<i64>,
        duration_minutes: u32,
        now: DateTime<Local>,
    ) -> Result<i64> {
        if duration_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_minutes".into(),
                message: "must be at least one minute".into(),
            }
            .into());
        }
        if let Some(open) = self.open_session()? {
            return Err(StateError::SessionAlreadyOpen {
                session_id: open.id,
            }
            .into());
        }

        self.conn().execute(
            "INSERT INTO focus_sessions (task_id, started_at, duration_minutes, completed)
             VALUES (?1, ?2, ?3, 0)",
            params![task_id, format_time(&now), duration_minutes],
        )?;
        let id = self.conn().last_insert_rowid();
        tracing::info!(id, ?task_id, duration_minutes, "focus session started");
        Ok(id)
    }

    /// The session that has not been finalized yet, if any.
    pub fn open_session(&self) -> Result<Option<FocusSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM focus_sessions
             WHERE ended_at IS NULL ORDER BY id DESC LIMIT 1"
        );
        Ok(self
            .conn()
            .query_row(&sql, [], row_to_session)
            .optional()?)
    }

    /// Look up a session that is expected to exist.
    pub fn get_session(&self, id: i64) -> Result<FocusSession> {
        load_session(self.conn(), id)?.ok_or(CoreError::NotFound {
            kind: "focus session",
            id,
        })
    }

    /// Finalize a session; with `collect_reward` also harvest a grape.
    ///
    /// Unknown ids and sessions that were already finalized are a no-op and
    /// return `None`. Whether the session is eligible for a reward is the
    /// caller's decision (see [`crate::progress::qualifies_for_reward`]).
    pub fn complete_session(
        &self,
        id: i64,
        collect_reward: bool,
    ) -> Result<Option<SessionOutcome>> {
        self.complete_session_at(id, collect_reward, Local::now())
    }

    pub fn complete_session_at(
        &self,
        id: i64,
        collect_reward: bool,
        now: DateTime<Local>,
    ) -> Result<Option<SessionOutcome>> {
        let tx = self.conn().unchecked_transaction()?;

        let Some(mut session) = load_session(&tx, id)? else {
            tracing::debug!(id, "complete_session: unknown session, ignoring");
            return Ok(None);
        };
        if !session.is_open() {
            tracing::debug!(id, "complete_session: session already finalized, ignoring");
            return Ok(None);
        }

        let focused_minutes = if collect_reward {
            session.duration_minutes
        } else {
            elapsed_minutes(&session.started_at, &now, session.duration_minutes)
        };

        tx.execute(
            "UPDATE focus_sessions
             SET completed = 1, ended_at = ?2, focused_minutes = ?3, rewarded = ?4
             WHERE id = ?1",
            params![id, format_time(&now), focused_minutes, collect_reward],
        )?;
        session.ended_at = Some(now);
        session.completed = true;
        session.focused_minutes = focused_minutes;
        session.rewarded = collect_reward;

        let reward = if collect_reward {
            let today = now.date_naive();
            let mut profile = load_profile(&tx)?;
            let outcome = profile.harvest(today, session.duration_minutes, self.extended_tiers());
            save_profile(&tx, &profile)?;
            record_daily_harvest(&tx, today, &outcome.harvest)?;
            tracing::debug!(
                total_grapes = profile.ledger.total_grapes,
                bunch_fill = profile.ledger.bunch_fill,
                box_fill = profile.ledger.box_fill,
                "grape ledger updated"
            );
            Some(outcome)
        } else {
            None
        };

        tx.commit()?;

        match &reward {
            Some(outcome) => {
                tracing::info!(id, level = outcome.level, streak = outcome.streak_days, "grape collected");
                if outcome.levels_gained > 0 {
                    tracing::info!(level = outcome.level, "level up");
                }
            }
            None => tracing::info!(id, focused_minutes, "focus session finalized without reward"),
        }

        Ok(Some(SessionOutcome { session, reward }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 3, day, hour, minute, 0)
            .single()
            .unwrap()
    }

    fn focus(db: &Database, start: DateTime<Local>) -> SessionOutcome {
        let id = db.start_session_at(None, 25, start).unwrap();
        db.complete_session_at(id, true, start + Duration::minutes(25))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn only_one_session_may_be_open() {
        let db = Database::open_memory().unwrap();
        let first = db.start_session(None, 25).unwrap();
        let err = db.start_session(None, 25).unwrap_err();
        assert!(matches!(
            err,
            CoreError::State(StateError::SessionAlreadyOpen { session_id }) if session_id == first
        ));

        db.complete_session(first, false).unwrap();
        assert!(db.start_session(None, 25).is_ok());
    }

    #[test]
    fn zero_minute_sessions_are_rejected() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.start_session(None, 0).unwrap_err(),
            CoreError::Validation(_)
        ));
        assert!(db.open_session().unwrap().is_none());
    }

    #[test]
    fn first_qualifying_session() {
        let db = Database::open_memory().unwrap();
        let outcome = focus(&db, at(2, 10, 0));

        let reward = outcome.reward.unwrap();
        assert_eq!(reward.xp_gained, 10);
        assert_eq!(reward.level, 1);
        assert_eq!(reward.streak_days, 1);
        assert!(outcome.session.completed);
        assert!(outcome.session.rewarded);
        assert_eq!(outcome.session.focused_minutes, 25);

        let profile = db.profile().unwrap();
        assert_eq!(profile.ledger.total_grapes, 1);
        assert_eq!(profile.ledger.bunch_fill, 1);
        assert_eq!(profile.level.experience, 10);
        assert_eq!(profile.streak.days, 1);
        assert_eq!(profile.total_focus_minutes, 25);
    }

    #[test]
    fn ten_sessions_in_one_day_roll_a_bunch() {
        let db = Database::open_memory().unwrap();
        for i in 0..10 {
            focus(&db, at(2, 8, 0) + Duration::minutes(30 * i));
        }
        let profile = db.profile().unwrap();
        assert_eq!(profile.ledger.bunch_fill, 0);
        assert_eq!(profile.ledger.total_bunches, 1);
        assert_eq!(profile.ledger.box_fill, 1);
        assert_eq!(profile.level.level, 2);

        let (grapes, bunches, boxes): (u32, u32, u32) = db
            .conn()
            .query_row(
                "SELECT grapes_earned, bunches_completed, boxes_completed FROM daily_stats WHERE date = '2026-03-02'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((grapes, bunches, boxes), (10, 1, 0));
    }

    #[test]
    fn abandoned_session_leaves_profile_untouched() {
        let db = Database::open_memory().unwrap();
        let before = db.profile().unwrap();

        let start = at(3, 9, 0);
        let id = db.start_session_at(Some(1), 25, start).unwrap();
        let outcome = db
            .complete_session_at(id, false, start + Duration::minutes(7))
            .unwrap()
            .unwrap();

        assert!(outcome.reward.is_none());
        assert!(outcome.session.completed);
        assert!(!outcome.session.rewarded);
        assert_eq!(outcome.session.ended_at, Some(start + Duration::minutes(7)));
        assert_eq!(outcome.session.focused_minutes, 7);
        assert_eq!(db.profile().unwrap(), before);

        let daily_rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM daily_stats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(daily_rows, 0);
    }

    #[test]
    fn finalized_sessions_are_never_reopened_or_rewarded_twice() {
        let db = Database::open_memory().unwrap();
        let outcome = focus(&db, at(4, 9, 0));
        let id = outcome.session.id;

        assert!(db.complete_session(id, true).unwrap().is_none());
        assert!(db.complete_session(4242, true).unwrap().is_none());
        assert_eq!(db.profile().unwrap().ledger.total_grapes, 1);
        assert_eq!(db.get_session(id).unwrap(), outcome.session);
    }

    #[test]
    fn get_unknown_session_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.get_session(5).unwrap_err(),
            CoreError::NotFound { kind: "focus session", id: 5 }
        ));
    }

    #[test]
    fn failed_transaction_rolls_back_the_session_row() {
        let db = Database::open_memory().unwrap();
        let start = at(5, 9, 0);
        let id = db.start_session_at(None, 25, start).unwrap();

        // Break the daily upsert so the transaction fails after the profile write.
        db.conn().execute_batch("DROP TABLE daily_stats").unwrap();
        assert!(db
            .complete_session_at(id, true, start + Duration::minutes(25))
            .is_err());

        let session = db.get_session(id).unwrap();
        assert!(session.is_open());
        assert!(!session.completed);
        assert_eq!(db.profile().unwrap().ledger.total_grapes, 0);
    }

    #[test]
    fn deleting_a_task_keeps_its_sessions() {
        let db = Database::open_memory().unwrap();
        let task = db.add_task("essay").unwrap();
        let id = db.start_session(Some(task), 25).unwrap();
        db.complete_session(id, true).unwrap();
        db.delete_task(task).unwrap();
        assert_eq!(db.get_session(id).unwrap().task_id, Some(task));
    }

    #[test]
    fn extended_tiers_are_applied_when_enabled() {
        let db = Database::open_memory().unwrap().with_extended_tiers(true);
        let mut profile = db.profile().unwrap();
        profile.ledger.total_grapes = 999;
        profile.ledger.total_bunches = 99;
        profile.ledger.total_boxes = 9;
        profile.ledger.bunch_fill = 9;
        profile.ledger.box_fill = 9;
        profile.ledger.bottle_fill = 9;
        save_profile(db.conn(), &profile).unwrap();

        let outcome = focus(&db, at(6, 9, 0));
        let harvest = outcome.reward.unwrap().harvest;
        assert!(harvest.box_completed);
        assert!(harvest.bottle_completed);

        let profile = db.profile().unwrap();
        assert_eq!(profile.ledger.total_bottles, 1);
        assert_eq!(profile.ledger.crate_fill, 1);
    }

    #[test]
    fn elapsed_minutes_are_capped_by_plan() {
        let start = at(7, 9, 0);
        assert_eq!(elapsed_minutes(&start, &(start + Duration::minutes(90)), 25), 25);
        assert_eq!(elapsed_minutes(&start, &(start - Duration::minutes(5)), 25), 0);
        assert_eq!(elapsed_minutes(&start, &(start + Duration::seconds(119)), 25), 1);
    }
}
