//! Database schema migrations for ppodo.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: tasks, sessions, daily stats, profile and badges.
///
/// `focus_sessions.task_id` carries no foreign key: deleting a task keeps the
/// history of sessions that referenced it.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            title        TEXT NOT NULL,
            completed    INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS focus_sessions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id          INTEGER,
            started_at       TEXT NOT NULL,
            ended_at         TEXT,
            duration_minutes INTEGER NOT NULL DEFAULT 25,
            completed        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            date              TEXT PRIMARY KEY,
            grapes_earned     INTEGER NOT NULL DEFAULT 0,
            bunches_completed INTEGER NOT NULL DEFAULT 0,
            boxes_completed   INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS profile (
            id                  INTEGER PRIMARY KEY CHECK (id = 1),
            level               INTEGER NOT NULL DEFAULT 1,
            experience          INTEGER NOT NULL DEFAULT 0,
            total_grapes        INTEGER NOT NULL DEFAULT 0,
            total_bunches       INTEGER NOT NULL DEFAULT 0,
            total_boxes         INTEGER NOT NULL DEFAULT 0,
            current_bunch_fill  INTEGER NOT NULL DEFAULT 0,
            current_box_fill    INTEGER NOT NULL DEFAULT 0,
            total_focus_minutes INTEGER NOT NULL DEFAULT 0,
            streak_days         INTEGER NOT NULL DEFAULT 0,
            last_focus_date     TEXT,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS badge_definitions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL UNIQUE,
            description     TEXT NOT NULL,
            icon            TEXT NOT NULL,
            category        TEXT NOT NULL,
            condition_type  TEXT NOT NULL,
            condition_value INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS awarded_badges (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            badge_id   INTEGER NOT NULL REFERENCES badge_definitions(id),
            awarded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: extended tiers and per-session focus accounting.
///
/// Adds:
/// - profile: total_bottles, total_crates, current_bottle_fill, current_crate_fill
/// - focus_sessions: focused_minutes (actual minutes), rewarded (grape collected)
/// - a unique index so a badge can only be awarded once
///
/// Existing finalized sessions are backfilled with their planned duration.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE profile ADD COLUMN total_bottles INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE profile ADD COLUMN total_crates INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE profile ADD COLUMN current_bottle_fill INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE profile ADD COLUMN current_crate_fill INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE focus_sessions ADD COLUMN focused_minutes INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE focus_sessions ADD COLUMN rewarded INTEGER NOT NULL DEFAULT 0;

         CREATE UNIQUE INDEX IF NOT EXISTS idx_awarded_badges_badge_id ON awarded_badges(badge_id);
         CREATE INDEX IF NOT EXISTS idx_focus_sessions_started_at ON focus_sessions(started_at);
         CREATE INDEX IF NOT EXISTS idx_focus_sessions_open ON focus_sessions(ended_at);",
    )?;

    tx.execute(
        "UPDATE focus_sessions
         SET focused_minutes = duration_minutes
         WHERE completed = 1",
        [],
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
