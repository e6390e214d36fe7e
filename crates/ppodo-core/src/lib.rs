//! # Ppodo Core Library
//!
//! This library provides the progression engine of the Ppodo Pomodoro timer:
//! finished focus sessions turn into grapes, grapes roll up into bunches and
//! boxes, and experience, daily streaks and badges follow. All operations are
//! available through the `ppodo` CLI binary, which is a thin layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Progress**: Pure rules for the grape ledger, leveling, streaks and the
//!   badge catalog
//! - **Storage**: SQLite persistence with one transaction per completed
//!   session, plus TOML-based configuration
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` for progress updates
//! - **Tracker**: Connects the timer to the session ledger and reports
//!   outcomes to a single listener
//!
//! ## Key Components
//!
//! - [`Database`]: Tasks, sessions, profile, statistics and badges
//! - [`FocusTracker`]: Timer-driven session lifecycle
//! - [`TimerEngine`]: Core timer state machine
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod progress;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use error::{ConfigError, CoreError, DatabaseError, Result, StateError, ValidationError};
pub use events::Event;
pub use progress::{
    qualifies_for_reward, BadgeCondition, BadgeContext, BadgeDefinition, BadgeStatus,
    GrapeLedger, HarvestOutcome, LevelProgress, Profile, RewardOutcome, Streak,
    MIN_REWARD_MINUTES,
};
pub use storage::{
    Config, DailyFocus, DailyStat, Database, FocusSession, ProfileSnapshot, SessionOutcome,
    Task, TaskFilter, TaskFocus, TodayStats,
};
pub use timer::{TimerEngine, TimerPhase, TimerState};
pub use tracker::{ActiveFocus, CompletionReport, FocusTracker, ProgressListener, TrackerStatus};
