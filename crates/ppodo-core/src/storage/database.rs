//! SQLite-backed store for the progression engine.
//!
//! Provides persistent storage for:
//! - Tasks and focus sessions
//! - The singleton profile (grapes, level, streak)
//! - Daily grape statistics
//! - The badge catalog and awarded badges
//! - Key-value store for presentation state
//!
//! The operations themselves live in sibling modules as further
//! `impl Database` blocks.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{badges, data_dir, migrations, profile};
use crate::error::{DatabaseError, Result};

/// SQLite database for the progression engine.
///
/// Owns the single connection; every completion event runs as one
/// transaction on it.
pub struct Database {
    conn: Connection,
    extended_tiers: bool,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/ppodo.db`.
    ///
    /// Creates the database file and schema if they don't exist, seeds the
    /// badge catalog and the profile row.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("ppodo.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        let inserted = badges::seed_catalog(&conn)?;
        if inserted > 0 {
            tracing::debug!(inserted, "seeded badge catalog");
        }
        profile::ensure_profile(&conn, &Local::now())?;
        Ok(Self {
            conn,
            extended_tiers: false,
        })
    }

    /// Enable or disable the bottle/crate rollover tiers.
    pub fn with_extended_tiers(mut self, enabled: bool) -> Self {
        self.extended_tiers = enabled;
        self
    }

    pub fn extended_tiers(&self) -> bool {
        self.extended_tiers
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

// === Column helpers ===

/// Format a timestamp for storage. The local offset is kept so that the
/// first ten characters are the local calendar date.
pub(crate) fn format_time(at: &DateTime<Local>) -> String {
    at.to_rfc3339()
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read an RFC 3339 timestamp column.
pub(crate) fn get_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_time(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Local>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Local))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(crate) fn get_opt_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}
