//! Persistence of the singleton profile row (`id = 1`).

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};

use super::database::{format_date, format_time, get_opt_date, get_time, Database};
use crate::error::Result;
use crate::progress::{GrapeLedger, LevelProgress, Profile, Streak};

/// Insert the profile row if it does not exist yet.
pub(crate) fn ensure_profile(conn: &Connection, now: &DateTime<Local>) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO profile (id, created_at) VALUES (1, ?1)",
        params![format_time(now)],
    )?;
    Ok(())
}

pub(crate) fn load_profile(conn: &Connection) -> rusqlite::Result<Profile> {
    conn.query_row(
        "SELECT level, experience,
                total_grapes, total_bunches, total_boxes, total_bottles, total_crates,
                current_bunch_fill, current_box_fill, current_bottle_fill, current_crate_fill,
                total_focus_minutes, streak_days, last_focus_date, created_at
         FROM profile WHERE id = 1",
        [],
        |row| {
            Ok(Profile {
                level: LevelProgress {
                    level: row.get(0)?,
                    experience: row.get(1)?,
                },
                ledger: GrapeLedger {
                    total_grapes: row.get(2)?,
                    total_bunches: row.get(3)?,
                    total_boxes: row.get(4)?,
                    total_bottles: row.get(5)?,
                    total_crates: row.get(6)?,
                    bunch_fill: row.get(7)?,
                    box_fill: row.get(8)?,
                    bottle_fill: row.get(9)?,
                    crate_fill: row.get(10)?,
                },
                total_focus_minutes: row.get(11)?,
                streak: Streak {
                    days: row.get(12)?,
                    last_focus_date: get_opt_date(row, 13)?,
                },
                created_at: get_time(row, 14)?,
            })
        },
    )
}

pub(crate) fn save_profile(conn: &Connection, profile: &Profile) -> rusqlite::Result<()> {
    let ledger = &profile.ledger;
    conn.execute(
        "UPDATE profile SET
            level = ?1,
            experience = ?2,
            total_grapes = ?3,
            total_bunches = ?4,
            total_boxes = ?5,
            total_bottles = ?6,
            total_crates = ?7,
            current_bunch_fill = ?8,
            current_box_fill = ?9,
            current_bottle_fill = ?10,
            current_crate_fill = ?11,
            total_focus_minutes = ?12,
            streak_days = ?13,
            last_focus_date = ?14
         WHERE id = 1",
        params![
            profile.level.level,
            profile.level.experience,
            ledger.total_grapes,
            ledger.total_bunches,
            ledger.total_boxes,
            ledger.total_bottles,
            ledger.total_crates,
            ledger.bunch_fill,
            ledger.box_fill,
            ledger.bottle_fill,
            ledger.crate_fill,
            profile.total_focus_minutes,
            profile.streak.days,
            profile.streak.last_focus_date.map(format_date),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Load the current profile.
    pub fn profile(&self) -> Result<Profile> {
        Ok(load_profile(self.conn())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fresh_profile_starts_at_level_one() {
        let db = Database::open_memory().unwrap();
        let profile = db.profile().unwrap();
        assert_eq!(profile.level, LevelProgress::default());
        assert_eq!(profile.ledger, GrapeLedger::default());
        assert_eq!(profile.streak, Streak::default());
        assert_eq!(profile.total_focus_minutes, 0);
    }

    #[test]
    fn save_and_load_every_field() {
        let db = Database::open_memory().unwrap();
        let mut profile = db.profile().unwrap();
        profile.level = LevelProgress {
            level: 4,
            experience: 120,
        };
        profile.ledger = GrapeLedger {
            total_grapes: 1234,
            total_bunches: 123,
            total_boxes: 12,
            total_bottles: 1,
            total_crates: 0,
            bunch_fill: 4,
            box_fill: 3,
            bottle_fill: 2,
            crate_fill: 1,
        };
        profile.streak = Streak {
            days: 6,
            last_focus_date: NaiveDate::from_ymd_opt(2026, 4, 30),
        };
        profile.total_focus_minutes = 30_850;

        save_profile(db.conn(), &profile).unwrap();
        assert_eq!(db.profile().unwrap(), profile);
    }

    #[test]
    fn ensure_profile_is_idempotent() {
        let db = Database::open_memory().unwrap();
        ensure_profile(db.conn(), &Local::now()).unwrap();
        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM profile", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
