//! Core error types for ppodo-core.
//!
//! Every fallible operation in the library returns [`CoreError`] (through the
//! [`Result`] alias). The sub-enums group failures by the layer that raised
//! them so callers can decide whether to re-prompt the user or give up.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for ppodo-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rejected user input; nothing was changed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation not allowed in the current session/timer state; nothing was changed.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A lookup for a record that was expected to exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt value in column '{column}': {value}")]
    Corrupt { column: &'static str, value: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Task title is empty or only whitespace
    #[error("Task title must not be empty")]
    EmptyTitle,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Session and timer state errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    /// Only one focus session may be open at a time.
    #[error("Focus session {session_id} is still open")]
    SessionAlreadyOpen { session_id: i64 },

    /// An action needs an open session but there is none.
    #[error("No focus session is active")]
    NoActiveSession,

    /// Timer action not applicable in the current timer state.
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: &'static str },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) if e.code == rusqlite::ErrorCode::DatabaseLocked => {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rusqlite_errors_map_to_query_failed() {
        let err = CoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::QueryFailed(_))
        ));
    }

    #[test]
    fn state_error_messages_are_readable() {
        let err = StateError::SessionAlreadyOpen { session_id: 7 };
        assert_eq!(err.to_string(), "Focus session 7 is still open");

        let err = StateError::InvalidTransition {
            from: "idle".into(),
            action: "pause",
        };
        assert_eq!(err.to_string(), "Cannot pause while idle");
    }

    #[test]
    fn not_found_names_the_record_kind() {
        let err = CoreError::NotFound { kind: "task", id: 42 };
        assert_eq!(err.to_string(), "task not found: 42");
    }
}
