//! Read-only snapshots for presentation layers.
//!
//! Nothing in here mutates state.

use chrono::{DateTime, Days, Local, NaiveDate};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::database::{format_date, Database};
use crate::error::Result;
use crate::progress::{xp_required_for, Profile};

/// Profile plus derived level progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    #[serde(flatten)]
    pub profile: Profile,
    /// Experience needed to advance from the current level.
    pub xp_required: u64,
    pub xp_to_next_level: u64,
    /// 0.0 .. 1.0 progress within the current level.
    pub level_progress: f64,
}

/// One row of `daily_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub grapes_earned: u32,
    pub bunches_completed: u32,
    pub boxes_completed: u32,
}

impl DailyStat {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            grapes_earned: 0,
            bunches_completed: 0,
            boxes_completed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayStats {
    #[serde(flatten)]
    pub daily: DailyStat,
    /// Finalized sessions started today that collected a grape.
    pub sessions_completed: u32,
    /// Minutes focused today across all finalized sessions.
    pub focus_minutes: u32,
}

/// Focus minutes of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub minutes: u32,
}

/// Focus minutes spent on one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFocus {
    pub task_id: i64,
    pub title: String,
    pub minutes: u32,
}

impl Database {
    pub fn get_profile_snapshot(&self) -> Result<ProfileSnapshot> {
        let profile = self.profile()?;
        let xp_required = xp_required_for(profile.level.level);
        Ok(ProfileSnapshot {
            xp_required,
            xp_to_next_level: profile.level.xp_to_next_level(),
            level_progress: profile.level.fraction(),
            profile,
        })
    }

    /// The daily row for `date`, zeroed if nothing was earned that day.
    pub fn get_daily_stat(&self, date: NaiveDate) -> Result<DailyStat> {
        let stat = self
            .conn()
            .query_row(
                "SELECT grapes_earned, bunches_completed, boxes_completed
                 FROM daily_stats WHERE date = ?1",
                params![format_date(date)],
                |row| {
                    Ok(DailyStat {
                        date,
                        grapes_earned: row.get(0)?,
                        bunches_completed: row.get(1)?,
                        boxes_completed: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(stat.unwrap_or_else(|| DailyStat::empty(date)))
    }

    pub fn get_today_stats(&self) -> Result<TodayStats> {
        self.get_today_stats_at(Local::now())
    }

    pub fn get_today_stats_at(&self, now: DateTime<Local>) -> Result<TodayStats> {
        let today = now.date_naive();
        let daily = self.get_daily_stat(today)?;
        let (sessions_completed, focus_minutes): (u32, u32) = self.conn().query_row(
            "SELECT COALESCE(SUM(rewarded), 0), COALESCE(SUM(focused_minutes), 0)
             FROM focus_sessions
             WHERE ended_at IS NOT NULL AND substr(started_at, 1, 10) = ?1",
            params![format_date(today)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TodayStats {
            daily,
            sessions_completed,
            focus_minutes,
        })
    }

    /// Focus minutes per day for the last `days` days, oldest first,
    /// today included. Days without sessions report zero.
    pub fn get_weekly_focus_minutes(&self, days: u32) -> Result<Vec<DailyFocus>> {
        self.get_weekly_focus_minutes_at(days, Local::now())
    }

    pub fn get_weekly_focus_minutes_at(
        &self,
        days: u32,
        now: DateTime<Local>,
    ) -> Result<Vec<DailyFocus>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let today = now.date_naive();
        let first = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);

        let mut stmt = self.conn().prepare(
            "SELECT substr(started_at, 1, 10) AS day, COALESCE(SUM(focused_minutes), 0)
             FROM focus_sessions
             WHERE ended_at IS NOT NULL AND substr(started_at, 1, 10) BETWEEN ?1 AND ?2
             GROUP BY day",
        )?;
        let totals = stmt
            .query_map(params![format_date(first), format_date(today)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        Ok(first
            .iter_days()
            .take_while(|date| *date <= today)
            .map(|date| DailyFocus {
                minutes: totals.get(&format_date(date)).copied().unwrap_or(0),
                date,
            })
            .collect())
    }

    /// Minutes focused today per task, largest first. Sessions without a
    /// task, or whose task was deleted, are left out.
    pub fn get_today_task_distribution(&self) -> Result<Vec<TaskFocus>> {
        self.get_today_task_distribution_at(Local::now())
    }

    pub fn get_today_task_distribution_at(&self, now: DateTime<Local>) -> Result<Vec<TaskFocus>> {
        let mut stmt = self.conn().prepare(
            "SELECT t.id, t.title, SUM(fs.focused_minutes) AS minutes
             FROM focus_sessions fs
             JOIN tasks t ON fs.task_id = t.id
             WHERE fs.ended_at IS NOT NULL AND substr(fs.started_at, 1, 10) = ?1
             GROUP BY t.id, t.title
             ORDER BY minutes DESC, t.title ASC",
        )?;
        let rows = stmt
            .query_map(params![format_date(now.date_naive())], |row| {
                Ok(TaskFocus {
                    task_id: row.get(0)?,
                    title: row.get(1)?,
                    minutes: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
