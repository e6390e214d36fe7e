//! Badge catalog seeding, listing and awarding.

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};

use super::database::{format_date, format_time, get_opt_time, Database};
use super::profile::load_profile;
use crate::error::{DatabaseError, Result};
use crate::progress::badges::{
    newly_satisfied, MORNING_END_HOUR, MORNING_START_HOUR, NIGHT_START_HOUR,
};
use crate::progress::{BadgeCondition, BadgeContext, BadgeDefinition, BadgeStatus, BADGE_CATALOG};

/// Insert every catalog badge that is not stored yet, keyed by unique name.
///
/// Safe to run on every startup; returns the number of rows inserted.
pub(crate) fn seed_catalog(conn: &Connection) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO badge_definitions
            (name, description, icon, category, condition_type, condition_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut inserted = 0;
    for entry in &BADGE_CATALOG {
        inserted += stmt.execute(params![
            entry.name,
            entry.description,
            entry.icon,
            entry.category,
            entry.condition.as_str(),
            entry.threshold,
        ])?;
    }
    Ok(inserted)
}

fn load_badges(conn: &Connection) -> Result<Vec<BadgeStatus>> {
    let mut stmt = conn.prepare(
        "SELECT bd.id, bd.name, bd.description, bd.icon, bd.category,
                bd.condition_type, bd.condition_value, ab.awarded_at
         FROM badge_definitions bd
         LEFT JOIN awarded_badges ab ON ab.badge_id = bd.id
         ORDER BY bd.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                BadgeDefinition {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    icon: row.get(3)?,
                    category: row.get(4)?,
                    // Placeholder until the condition string is decoded below.
                    condition: BadgeCondition::Grapes,
                    threshold: row.get(6)?,
                },
                row.get::<_, String>(5)?,
                get_opt_time(row, 7)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(mut badge, condition, awarded_at)| -> Result<BadgeStatus> {
            badge.condition =
                BadgeCondition::parse(&condition).ok_or(DatabaseError::Corrupt {
                    column: "condition_type",
                    value: condition,
                })?;
            Ok(BadgeStatus {
                badge,
                earned: awarded_at.is_some(),
                awarded_at,
            })
        })
        .collect()
}

fn count_rewarded_sessions_by_hour(
    conn: &Connection,
    from_hour: u32,
    until_hour: u32,
) -> rusqlite::Result<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM focus_sessions
         WHERE rewarded = 1
           AND CAST(substr(started_at, 12, 2) AS INTEGER) >= ?1
           AND CAST(substr(started_at, 12, 2) AS INTEGER) < ?2",
        params![from_hour, until_hour],
        |row| row.get(0),
    )
}

fn build_context(conn: &Connection, now: &DateTime<Local>) -> rusqlite::Result<BadgeContext> {
    let profile = load_profile(conn)?;
    let today = format_date(now.date_naive());

    let daily_grapes: u32 = conn.query_row(
        "SELECT COALESCE(MAX(grapes_earned), 0) FROM daily_stats WHERE date = ?1",
        params![today],
        |row| row.get(0),
    )?;
    let monthly_focus_days: u32 = conn.query_row(
        "SELECT COUNT(*) FROM daily_stats
         WHERE grapes_earned > 0 AND substr(date, 1, 7) = substr(?1, 1, 7)",
        params![today],
        |row| row.get(0),
    )?;
    let tasks_completed: u64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE completed = 1",
        [],
        |row| row.get(0),
    )?;

    Ok(BadgeContext {
        total_grapes: profile.ledger.total_grapes,
        total_bunches: profile.ledger.total_bunches,
        total_boxes: profile.ledger.total_boxes,
        streak_days: profile.streak.days,
        daily_grapes,
        monthly_focus_days,
        morning_sessions: count_rewarded_sessions_by_hour(
            conn,
            MORNING_START_HOUR,
            MORNING_END_HOUR,
        )?,
        night_sessions: count_rewarded_sessions_by_hour(conn, NIGHT_START_HOUR, 24)?,
        level: profile.level.level,
        tasks_completed,
        total_focus_minutes: profile.total_focus_minutes,
    })
}

impl Database {
    /// Every catalog badge with its earned flag, in catalog order.
    pub fn get_all_badges_with_status(&self) -> Result<Vec<BadgeStatus>> {
        load_badges(self.conn())
    }

    /// The aggregates badge predicates are evaluated against.
    pub fn badge_context_at(&self, now: DateTime<Local>) -> Result<BadgeContext> {
        Ok(build_context(self.conn(), &now)?)
    }

    /// Award every badge whose predicate holds and that is not awarded yet.
    ///
    /// Returns only the newly awarded badges; calling again without a state
    /// change returns an empty list.
    pub fn evaluate_and_award(&self) -> Result<Vec<BadgeStatus>> {
        self.evaluate_and_award_at(Local::now())
    }

    pub fn evaluate_and_award_at(&self, now: DateTime<Local>) -> Result<Vec<BadgeStatus>> {
        let tx = self.conn().unchecked_transaction()?;

        let ctx = build_context(&tx, &now)?;
        let statuses = load_badges(&tx)?;
        let satisfied = newly_satisfied(&statuses, &ctx);

        let mut awarded = Vec::with_capacity(satisfied.len());
        for badge in satisfied {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO awarded_badges (badge_id, awarded_at) VALUES (?1, ?2)",
                params![badge.id, format_time(&now)],
            )?;
            if inserted == 0 {
                continue;
            }
            tracing::info!(badge = %badge.name, icon = %badge.icon, "badge awarded");
            awarded.push(BadgeStatus {
                badge: badge.clone(),
                earned: true,
                awarded_at: Some(now),
            });
        }

        tx.commit()?;
        Ok(awarded)
    }
}
