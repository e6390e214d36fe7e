use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{TimerPhase, TimerState};

/// Every timer transition and progression outcome produces an Event.
/// The registered progress listener receives them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    FocusStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    BreakStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: TimerPhase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: TimerPhase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The user stopped the timer before the phase ran out.
    TimerStopped {
        phase: TimerPhase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The focus countdown reached zero.
    FocusCompleted {
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    BreakCompleted {
        at: DateTime<Utc>,
    },
    GrapeEarned {
        total_grapes: u64,
        bunch_completed: bool,
        box_completed: bool,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u32,
        at: DateTime<Utc>,
    },
    BadgeAwarded {
        badge_id: i64,
        name: String,
        icon: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        phase: Option<TimerPhase>,
        remaining_ms: u64,
        total_ms: u64,
        /// 0.0 .. 1.0 progress within the current phase.
        progress: f64,
        at: DateTime<Utc>,
    },
}
