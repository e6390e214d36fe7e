//! Focus tracker: drives the timer and turns finished focus phases into
//! progress.
//!
//! The tracker owns the [`Database`] handle and one [`TimerEngine`]. Starting
//! a focus phase opens a session; when the countdown runs out the session is
//! completed, with a reward only if its planned length qualifies, and badges
//! are evaluated afterwards. Stopping a focus phase early abandons the
//! session. Pausing and ticking never write progress.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::Event;
use crate::progress::{qualifies_for_reward, BadgeStatus, RewardOutcome};
use crate::storage::{Database, FocusSession, SessionOutcome, TimerConfig};
use crate::timer::{TimerEngine, TimerPhase};

/// kv key the tracker state is stored under between processes.
const STATE_KEY: &str = "tracker.state";

/// Receives everything a tracker does, in order.
pub trait ProgressListener {
    fn on_event(&mut self, event: &Event);

    /// Called once per finished focus phase, after its events.
    fn on_completion(&mut self, _report: &CompletionReport) {}
}

/// What one finished focus phase produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub session: FocusSession,
    pub reward: Option<RewardOutcome>,
    pub new_badges: Vec<BadgeStatus>,
}

/// The session behind the current focus phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFocus {
    pub session_id: i64,
    pub collect_reward: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TrackerState {
    timer: TimerEngine,
    active: Option<ActiveFocus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerStatus {
    /// Always an `Event::StateSnapshot`.
    pub timer: Event,
    pub session: Option<FocusSession>,
    pub collect_reward: bool,
}

/// A stored completion waiting to be reported.
struct FinishedFocus {
    report: CompletionReport,
    total_grapes: u64,
    at: DateTime<Utc>,
}

pub struct FocusTracker {
    db: Database,
    timer: TimerEngine,
    active: Option<ActiveFocus>,
    focus_minutes: u32,
    listener: Option<Box<dyn ProgressListener>>,
}

fn epoch_ms(now: &DateTime<Local>) -> u64 {
    u64::try_from(now.timestamp_millis()).unwrap_or(0)
}

impl FocusTracker {
    pub fn new(db: Database, config: &TimerConfig) -> Self {
        Self {
            db,
            timer: TimerEngine::new(config.break_minutes),
            active: None,
            focus_minutes: config.focus_minutes,
            listener: None,
        }
    }

    /// Pick up the timer and active session stored by [`FocusTracker::save`].
    pub fn restore(db: Database, config: &TimerConfig) -> Result<Self> {
        let mut tracker = Self::new(db, config);
        if let Some(raw) = tracker.db.kv_get(STATE_KEY)? {
            let state: TrackerState = serde_json::from_str(&raw)?;
            tracker.timer = state.timer;
            tracker.timer.set_break_minutes(config.break_minutes);
            tracker.active = state.active;
        }
        Ok(tracker)
    }

    pub fn save(&self) -> Result<()> {
        let state = TrackerState {
            timer: self.timer.clone(),
            active: self.active,
        };
        self.db.kv_set(STATE_KEY, &serde_json::to_string(&state)?)
    }

    /// Register the listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: Box<dyn ProgressListener>) {
        self.listener = Some(listener);
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn active(&self) -> Option<ActiveFocus> {
        self.active
    }

    pub fn start_focus(&mut self, task_id: Option<i64>, minutes: Option<u32>) -> Result<i64> {
        self.start_focus_at(task_id, minutes, Local::now())
    }

    /// Open a session and start the focus countdown. `minutes` defaults to
    /// the configured focus length.
    ///
    /// # Errors
    /// `StateError` if a focus phase is already running or paused, or if a
    /// session is open; nothing changes in that case.
    pub fn start_focus_at(
        &mut self,
        task_id: Option<i64>,
        minutes: Option<u32>,
        now: DateTime<Local>,
    ) -> Result<i64> {
        let minutes = minutes.unwrap_or(self.focus_minutes);
        if !self.timer.can_start_focus() {
            // Produces the matching InvalidTransition error.
            self.timer.start_focus_at(minutes, epoch_ms(&now))?;
        }
        let session_id = self.db.start_session_at(task_id, minutes, now)?;
        let event = self.timer.start_focus_at(minutes, epoch_ms(&now))?;
        self.active = Some(ActiveFocus {
            session_id,
            collect_reward: qualifies_for_reward(minutes),
        });
        self.emit(&event);
        Ok(session_id)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.pause_at(Local::now())
    }

    pub fn pause_at(&mut self, now: DateTime<Local>) -> Result<()> {
        let event = self.timer.pause_at(epoch_ms(&now))?;
        self.emit(&event);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.resume_at(Local::now())
    }

    pub fn resume_at(&mut self, now: DateTime<Local>) -> Result<()> {
        let event = self.timer.resume_at(epoch_ms(&now))?;
        self.emit(&event);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<Option<SessionOutcome>> {
        self.stop_at(Local::now())
    }

    /// Stop the timer. Stopping a focus phase abandons its session without
    /// a reward; stopping a break only ends the break.
    pub fn stop_at(&mut self, now: DateTime<Local>) -> Result<Option<SessionOutcome>> {
        let event = self.timer.stop_at(epoch_ms(&now))?;
        self.emit(&event);

        let abandoned = matches!(
            event,
            Event::TimerStopped {
                phase: TimerPhase::Focus,
                ..
            }
        );
        match self.active.take() {
            Some(active) if abandoned => {
                let outcome = self.db.complete_session_at(active.session_id, false, now)?;
                if outcome.is_some() {
                    tracing::info!(session_id = active.session_id, "focus session abandoned");
                }
                Ok(outcome)
            }
            _ => Ok(None),
        }
    }

    pub fn tick(&mut self) -> Result<Option<CompletionReport>> {
        self.tick_at(Local::now())
    }

    /// Advance the timer to `now`, finishing the focus session if the
    /// countdown ran out.
    ///
    /// The session is completed at the moment the countdown reached zero, not
    /// at `now`, so a late tick still credits the day the focus happened. The
    /// timer only moves once the completion is stored; after a storage error
    /// the next tick retries it.
    pub fn tick_at(&mut self, now: DateTime<Local>) -> Result<Option<CompletionReport>> {
        let mut timer = self.timer.clone();
        let events = timer.tick_at(epoch_ms(&now));

        let mut completion = None;
        let mut focus_done = false;
        for event in &events {
            if let Event::FocusCompleted { at, .. } = event {
                completion = self.complete_focus(at.with_timezone(&Local))?;
                focus_done = true;
            }
        }
        self.timer = timer;
        if focus_done {
            self.active = None;
        }

        let mut report = None;
        for event in &events {
            self.emit(event);
            if matches!(event, Event::FocusCompleted { .. }) {
                if let Some(done) = completion.take() {
                    report = Some(self.announce(done));
                }
            }
        }
        Ok(report)
    }

    pub fn status(&self) -> Result<TrackerStatus> {
        self.status_at(Local::now())
    }

    pub fn status_at(&self, now: DateTime<Local>) -> Result<TrackerStatus> {
        let session = match self.active {
            Some(active) => Some(self.db.get_session(active.session_id)?),
            None => None,
        };
        Ok(TrackerStatus {
            timer: self.timer.snapshot_at(epoch_ms(&now)),
            session,
            collect_reward: self.active.is_some_and(|a| a.collect_reward),
        })
    }

    /// Store the end of the active focus session, ended at `ended_at`.
    fn complete_focus(&self, ended_at: DateTime<Local>) -> Result<Option<FinishedFocus>> {
        let Some(active) = self.active else {
            return Ok(None);
        };
        let outcome =
            self.db
                .complete_session_at(active.session_id, active.collect_reward, ended_at)?;
        let Some(outcome) = outcome else {
            tracing::warn!(
                session_id = active.session_id,
                "focus session was already finalized, nothing to reward"
            );
            return Ok(None);
        };

        let (new_badges, total_grapes) = if outcome.reward.is_some() {
            (
                self.db.evaluate_and_award_at(ended_at)?,
                self.db.profile()?.ledger.total_grapes,
            )
        } else {
            (Vec::new(), 0)
        };

        Ok(Some(FinishedFocus {
            report: CompletionReport {
                session: outcome.session,
                reward: outcome.reward,
                new_badges,
            },
            total_grapes,
            at: ended_at.with_timezone(&Utc),
        }))
    }

    fn announce(&mut self, done: FinishedFocus) -> CompletionReport {
        let FinishedFocus {
            report,
            total_grapes,
            at,
        } = done;
        if let Some(reward) = &report.reward {
            self.emit(&Event::GrapeEarned {
                total_grapes,
                bunch_completed: reward.harvest.bunch_completed,
                box_completed: reward.harvest.box_completed,
                at,
            });
            if reward.levels_gained > 0 {
                self.emit(&Event::LevelUp {
                    level: reward.level,
                    at,
                });
            }
        }
        for status in &report.new_badges {
            self.emit(&Event::BadgeAwarded {
                badge_id: status.badge.id,
                name: status.badge.name.clone(),
                icon: status.badge.icon.clone(),
                at,
            });
        }
        if let Some(listener) = self.listener.as_mut() {
            listener.on_completion(&report);
        }
        report
    }

    fn emit(&mut self, event: &Event) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_event(event);
        }
    }
}
