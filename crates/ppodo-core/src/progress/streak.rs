//! Consecutive-day focus streak.
//!
//! The streak is evaluated strictly by calendar date: a session at 23:59 and
//! another at 00:01 the next day are on consecutive days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Streak counter plus the date of the most recent qualifying session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    #[serde(rename = "streak_days")]
    pub days: u32,
    pub last_focus_date: Option<NaiveDate>,
}

impl Streak {
    /// Record a qualifying session on `today`.
    pub fn record(&mut self, today: NaiveDate) {
        self.days = match self.last_focus_date {
            None => 1,
            Some(last) => match (today - last).num_days() {
                0 => self.days,
                1 => self.days.saturating_add(1),
                gap => {
                    if gap < 0 {
                        tracing::warn!(%last, %today, "last focus date lies in the future; restarting streak");
                    }
                    1
                }
            },
        };
        self.last_focus_date = Some(today);
    }
}
