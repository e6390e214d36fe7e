use std::cell::RefCell;
use std::rc::Rc;

use clap::Subcommand;
use ppodo_core::{Event, FocusTracker, ProgressListener};
use serde_json::json;

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a focus phase (opens a session)
    Start {
        /// Task the session is spent on
        #[arg(long)]
        task: Option<i64>,
        /// Focus length (default: timer.focus_minutes)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Pause the running phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Stop the timer; stopping a focus phase abandons its session
    Stop,
    /// Print current timer state as JSON
    Status,
    /// Advance the timer to now and report finished phases
    Tick,
}

/// Collects tracker events for the JSON output.
struct EventLog(Rc<RefCell<Vec<Event>>>);

impl ProgressListener for EventLog {
    fn on_event(&mut self, event: &Event) {
        self.0.borrow_mut().push(event.clone());
    }
}

pub fn run(action: TimerAction) -> CliResult {
    let (db, config) = open()?;
    let mut tracker = FocusTracker::restore(db, &config.timer)?;
    let events = Rc::new(RefCell::new(Vec::new()));
    tracker.set_listener(Box::new(EventLog(events.clone())));

    // Catch up with the wall clock before acting, so a focus phase that ran
    // out between invocations is rewarded first.
    let completion = tracker.tick()?;
    tracker.save()?;

    let abandoned = match action {
        TimerAction::Start { task, minutes } => {
            tracker.start_focus(task, minutes)?;
            None
        }
        TimerAction::Pause => {
            tracker.pause()?;
            None
        }
        TimerAction::Resume => {
            tracker.resume()?;
            None
        }
        TimerAction::Stop => tracker.stop()?,
        TimerAction::Status | TimerAction::Tick => None,
    };
    tracker.save()?;

    let events = events.borrow();
    print_json(&json!({
        "events": &*events,
        "completion": completion,
        "abandoned": abandoned,
        "status": tracker.status()?,
    }))
}
