//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` periodically.
//! Every command has an `*_at(now_ms)` variant taking epoch milliseconds so
//! callers (and tests) control the clock.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Focus -> Break -> Idle
//!         Focus <-> Paused <-> Break
//! ```
//!
//! A finished focus phase starts the break on its own. Ticks only move the
//! countdown; the engine never touches stored progress.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(5);
//! engine.start_focus(25)?;
//! // In a loop:
//! for event in engine.tick() { /* FocusCompleted, BreakStarted, ... */ }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Focus,
    Break,
    Paused,
}

/// The countdown a running or paused timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Focus,
    Break,
}

impl TimerState {
    fn describe(self) -> String {
        match self {
            TimerState::Idle => "idle",
            TimerState::Focus => "focusing",
            TimerState::Break => "on a break",
            TimerState::Paused => "paused",
        }
        .to_string()
    }
}

/// Core timer engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// Serializable so a short-lived process can store it between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerState,
    /// Phase that was running when the timer was paused.
    #[serde(default)]
    paused_phase: Option<TimerPhase>,
    break_minutes: u32,
    /// Length of the current phase in minutes.
    phase_minutes: u32,
    /// Remaining time in milliseconds for the current phase.
    remaining_ms: u64,
    /// Timestamp (ms since epoch) of the last start/resume/tick.
    #[serde(default)]
    last_tick_epoch_ms: Option<u64>,
}

impl TimerEngine {
    /// Create an idle engine; breaks last `break_minutes`.
    pub fn new(break_minutes: u32) -> Self {
        Self {
            state: TimerState::Idle,
            paused_phase: None,
            break_minutes,
            phase_minutes: 0,
            remaining_ms: 0,
            last_tick_epoch_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// The phase the timer is in, counting a paused phase.
    pub fn phase(&self) -> Option<TimerPhase> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Focus => Some(TimerPhase::Focus),
            TimerState::Break => Some(TimerPhase::Break),
            TimerState::Paused => self.paused_phase,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Focus | TimerState::Break)
    }

    /// Remaining time as of the last command or tick.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Remaining time at `now_ms`, without advancing the engine.
    pub fn remaining_ms_at(&self, now_ms: u64) -> u64 {
        match self.last_tick_epoch_ms {
            Some(last) if self.is_running() => self
                .remaining_ms
                .saturating_sub(now_ms.saturating_sub(last)),
            _ => self.remaining_ms,
        }
    }

    pub fn total_ms(&self) -> u64 {
        minutes_to_ms(self.phase_minutes)
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    pub fn set_break_minutes(&mut self, minutes: u32) {
        self.break_minutes = minutes;
    }

    /// Whether a focus phase may start now. A break, running or paused, can
    /// be cut short by a new focus phase.
    pub fn can_start_focus(&self) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Break => true,
            TimerState::Paused => self.paused_phase == Some(TimerPhase::Break),
            TimerState::Focus => false,
        }
    }

    pub fn snapshot(&self) -> Event {
        self.snapshot_at(now_ms())
    }

    /// Build a full state snapshot event.
    pub fn snapshot_at(&self, now_ms: u64) -> Event {
        let total = self.total_ms();
        let remaining = self.remaining_ms_at(now_ms);
        let progress = if total == 0 || self.state == TimerState::Idle {
            0.0
        } else {
            1.0 - (remaining as f64 / total as f64)
        };
        Event::StateSnapshot {
            state: self.state,
            phase: self.phase(),
            remaining_ms: remaining,
            total_ms: total,
            progress,
            at: timestamp(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_focus(&mut self, minutes: u32) -> Result<Event, StateError> {
        self.start_focus_at(minutes, now_ms())
    }

    pub fn start_focus_at(&mut self, minutes: u32, now_ms: u64) -> Result<Event, StateError> {
        if !self.can_start_focus() {
            return Err(self.invalid("start a focus phase"));
        }
        self.enter(TimerPhase::Focus, minutes, now_ms);
        Ok(Event::FocusStarted {
            duration_secs: u64::from(minutes) * 60,
            at: timestamp(now_ms),
        })
    }

    pub fn start_break(&mut self) -> Result<Event, StateError> {
        self.start_break_at(now_ms())
    }

    /// Start a break by hand. Only allowed while idle.
    pub fn start_break_at(&mut self, now_ms: u64) -> Result<Event, StateError> {
        if self.state != TimerState::Idle {
            return Err(self.invalid("start a break"));
        }
        Ok(self.enter_break(now_ms))
    }

    pub fn pause(&mut self) -> Result<Event, StateError> {
        self.pause_at(now_ms())
    }

    pub fn pause_at(&mut self, now_ms: u64) -> Result<Event, StateError> {
        let phase = match self.state {
            TimerState::Focus => TimerPhase::Focus,
            TimerState::Break => TimerPhase::Break,
            _ => return Err(self.invalid("pause")),
        };
        self.flush_elapsed(now_ms);
        self.state = TimerState::Paused;
        self.paused_phase = Some(phase);
        self.last_tick_epoch_ms = None;
        Ok(Event::TimerPaused {
            phase,
            remaining_ms: self.remaining_ms,
            at: timestamp(now_ms),
        })
    }

    pub fn resume(&mut self) -> Result<Event, StateError> {
        self.resume_at(now_ms())
    }

    pub fn resume_at(&mut self, now_ms: u64) -> Result<Event, StateError> {
        let phase = match (self.state, self.paused_phase) {
            (TimerState::Paused, Some(phase)) => phase,
            _ => return Err(self.invalid("resume")),
        };
        self.state = match phase {
            TimerPhase::Focus => TimerState::Focus,
            TimerPhase::Break => TimerState::Break,
        };
        self.paused_phase = None;
        self.last_tick_epoch_ms = Some(now_ms);
        Ok(Event::TimerResumed {
            phase,
            remaining_ms: self.remaining_ms,
            at: timestamp(now_ms),
        })
    }

    pub fn stop(&mut self) -> Result<Event, StateError> {
        self.stop_at(now_ms())
    }

    /// Abort the current phase, running or paused, and go idle.
    pub fn stop_at(&mut self, now_ms: u64) -> Result<Event, StateError> {
        let phase = self.phase().ok_or_else(|| self.invalid("stop"))?;
        self.flush_elapsed(now_ms);
        let remaining_ms = self.remaining_ms;
        self.reset();
        Ok(Event::TimerStopped {
            phase,
            remaining_ms,
            at: timestamp(now_ms),
        })
    }

    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(now_ms())
    }

    /// Advance the countdown to `now_ms`.
    ///
    /// Returns `FocusCompleted` followed by `BreakStarted` when the focus
    /// phase runs out, and `BreakCompleted` when the break does. Time past
    /// the end of one phase is carried into the next, so a late tick may
    /// report several transitions at once.
    pub fn tick_at(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(last) = self.last_tick_epoch_ms.filter(|_| self.is_running()) else {
            return events;
        };
        let mut elapsed = now_ms.saturating_sub(last);
        self.last_tick_epoch_ms = Some(now_ms);

        while self.is_running() {
            if elapsed < self.remaining_ms {
                self.remaining_ms -= elapsed;
                break;
            }
            elapsed -= self.remaining_ms;
            let ended_at = now_ms - elapsed;

            if self.state == TimerState::Focus {
                events.push(Event::FocusCompleted {
                    duration_minutes: self.phase_minutes,
                    at: timestamp(ended_at),
                });
                events.push(self.enter_break(ended_at));
                self.last_tick_epoch_ms = Some(now_ms);
            } else {
                events.push(Event::BreakCompleted {
                    at: timestamp(ended_at),
                });
                self.reset();
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter(&mut self, phase: TimerPhase, minutes: u32, now_ms: u64) {
        self.state = match phase {
            TimerPhase::Focus => TimerState::Focus,
            TimerPhase::Break => TimerState::Break,
        };
        self.paused_phase = None;
        self.phase_minutes = minutes;
        self.remaining_ms = minutes_to_ms(minutes);
        self.last_tick_epoch_ms = Some(now_ms);
    }

    fn enter_break(&mut self, now_ms: u64) -> Event {
        self.enter(TimerPhase::Break, self.break_minutes, now_ms);
        Event::BreakStarted {
            duration_secs: u64::from(self.break_minutes) * 60,
            at: timestamp(now_ms),
        }
    }

    fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.paused_phase = None;
        self.phase_minutes = 0;
        self.remaining_ms = 0;
        self.last_tick_epoch_ms = None;
    }

    fn flush_elapsed(&mut self, now_ms: u64) {
        if let Some(last) = self.last_tick_epoch_ms {
            let elapsed = now_ms.saturating_sub(last);
            self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
            self.last_tick_epoch_ms = Some(now_ms);
        }
    }

    fn invalid(&self, action: &'static str) -> StateError {
        StateError::InvalidTransition {
            from: self.state.describe(),
            action,
        }
    }
}

fn minutes_to_ms(minutes: u32) -> u64 {
    u64::from(minutes) * 60 * 1000
}

fn timestamp(epoch_ms: u64) -> DateTime<Utc> {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;
    const MIN: u64 = 60_000;

    fn focusing(minutes: u32) -> TimerEngine {
        let mut engine = TimerEngine::new(5);
        engine.start_focus_at(minutes, T0).unwrap();
        engine
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new(5);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.phase(), None);

        engine.start_focus_at(25, T0).unwrap();
        assert_eq!(engine.state(), TimerState::Focus);

        let paused = engine.pause_at(T0 + 10 * MIN).unwrap();
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.phase(), Some(TimerPhase::Focus));
        assert!(matches!(
            paused,
            Event::TimerPaused { remaining_ms, .. } if remaining_ms == 15 * MIN
        ));

        // Time spent paused does not count.
        engine.resume_at(T0 + 60 * MIN).unwrap();
        assert_eq!(engine.state(), TimerState::Focus);
        assert!(engine.tick_at(T0 + 74 * MIN).is_empty());
        assert_eq!(engine.remaining_ms(), MIN);
    }

    #[test]
    fn invalid_commands_are_rejected_without_change() {
        let mut engine = TimerEngine::new(5);
        assert!(engine.pause_at(T0).is_err());
        assert!(engine.resume_at(T0).is_err());
        assert!(engine.stop_at(T0).is_err());

        engine.start_focus_at(25, T0).unwrap();
        let err = engine.start_focus_at(25, T0).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: "focusing".into(),
                action: "start a focus phase",
            }
        );
        assert!(engine.resume_at(T0).is_err());
        assert!(engine.start_break_at(T0).is_err());
        assert_eq!(engine.state(), TimerState::Focus);
    }

    #[test]
    fn focus_completion_starts_the_break() {
        let mut engine = focusing(25);
        assert!(engine.tick_at(T0 + 24 * MIN).is_empty());

        let events = engine.tick_at(T0 + 25 * MIN);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::FocusCompleted {
                duration_minutes: 25,
                ..
            }
        ));
        assert!(matches!(events[1], Event::BreakStarted { duration_secs: 300, .. }));
        assert_eq!(engine.state(), TimerState::Break);
        assert_eq!(engine.remaining_ms(), 5 * MIN);

        let events = engine.tick_at(T0 + 30 * MIN);
        assert!(matches!(events[..], [Event::BreakCompleted { .. }]));
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn late_tick_carries_overshoot_into_the_break() {
        let mut engine = focusing(25);
        let events = engine.tick_at(T0 + 27 * MIN);
        assert_eq!(events.len(), 2);
        assert_eq!(engine.remaining_ms(), 3 * MIN);

        let mut engine = focusing(25);
        let events = engine.tick_at(T0 + 2 * 60 * MIN);
        assert_eq!(events.len(), 3);
        assert_eq!(engine.state(), TimerState::Idle);
        match &events[0] {
            Event::FocusCompleted { at, .. } => {
                assert_eq!(at.timestamp_millis() as u64, T0 + 25 * MIN)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn paused_timer_does_not_complete() {
        let mut engine = focusing(25);
        engine.pause_at(T0 + MIN).unwrap();
        assert!(engine.tick_at(T0 + 100 * MIN).is_empty());
        assert_eq!(engine.remaining_ms(), 24 * MIN);
    }

    #[test]
    fn stop_returns_to_idle_from_any_phase() {
        let mut engine = focusing(25);
        let stopped = engine.stop_at(T0 + 5 * MIN).unwrap();
        assert!(matches!(
            stopped,
            Event::TimerStopped { phase: TimerPhase::Focus, remaining_ms, .. } if remaining_ms == 20 * MIN
        ));
        assert_eq!(engine.state(), TimerState::Idle);

        engine.start_break_at(T0).unwrap();
        engine.pause_at(T0 + MIN).unwrap();
        let stopped = engine.stop_at(T0 + 2 * MIN).unwrap();
        assert!(matches!(stopped, Event::TimerStopped { phase: TimerPhase::Break, .. }));
    }

    #[test]
    fn focus_may_cut_a_break_short() {
        let mut engine = focusing(25);
        engine.tick_at(T0 + 26 * MIN);
        assert!(engine.can_start_focus());
        engine.pause_at(T0 + 27 * MIN).unwrap();
        assert!(engine.can_start_focus());
        engine.start_focus_at(50, T0 + 28 * MIN).unwrap();
        assert_eq!(engine.state(), TimerState::Focus);
        assert_eq!(engine.total_ms(), 50 * MIN);
    }

    #[test]
    fn snapshot_reports_progress_without_advancing() {
        let engine = focusing(20);
        match engine.snapshot_at(T0 + 5 * MIN) {
            Event::StateSnapshot {
                state,
                phase,
                remaining_ms,
                total_ms,
                progress,
                ..
            } => {
                assert_eq!(state, TimerState::Focus);
                assert_eq!(phase, Some(TimerPhase::Focus));
                assert_eq!(remaining_ms, 15 * MIN);
                assert_eq!(total_ms, 20 * MIN);
                assert!((progress - 0.25).abs() < 1e-9);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
        assert_eq!(engine.remaining_ms(), 20 * MIN);
    }

    #[test]
    fn engine_survives_a_json_round_trip() {
        let mut engine = focusing(25);
        engine.pause_at(T0 + MIN).unwrap();
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: TimerEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, engine);
        restored.resume_at(T0 + 2 * MIN).unwrap();
        assert_eq!(restored.state(), TimerState::Focus);
    }
}
