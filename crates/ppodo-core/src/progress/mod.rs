//! Progression rules: grapes, experience, streaks and badges.
//!
//! Everything here is pure state arithmetic. The storage layer loads a
//! [`Profile`], applies [`Profile::harvest`] and writes the result back in
//! the same transaction that finalizes the focus session.

pub mod badges;
pub mod ledger;
pub mod level;
pub mod streak;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub use badges::{
    BadgeCondition, BadgeContext, BadgeDefinition, BadgeTemplate, BadgeStatus, BADGE_CATALOG,
};
pub use ledger::{GrapeLedger, HarvestOutcome, TIER_CAPACITY};
pub use level::{xp_required_for, LevelProgress, XP_PER_GRAPE};
pub use streak::Streak;

/// Planned focus length (minutes) a session needs to be eligible for a reward.
pub const MIN_REWARD_MINUTES: u32 = 15;

/// Whether a session planned for `duration_minutes` may collect a reward.
pub fn qualifies_for_reward(duration_minutes: u32) -> bool {
    duration_minutes >= MIN_REWARD_MINUTES
}

/// The singleton aggregate every progression component mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub ledger: GrapeLedger,
    #[serde(flatten)]
    pub level: LevelProgress,
    #[serde(flatten)]
    pub streak: Streak,
    pub total_focus_minutes: u64,
    pub created_at: DateTime<Local>,
}

/// Everything one qualifying completion changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardOutcome {
    pub harvest: HarvestOutcome,
    pub xp_gained: u64,
    pub levels_gained: u32,
    pub level: u32,
    pub streak_days: u32,
}

impl Profile {
    pub fn new(created_at: DateTime<Local>) -> Self {
        Self {
            ledger: GrapeLedger::default(),
            level: LevelProgress::default(),
            streak: Streak::default(),
            total_focus_minutes: 0,
            created_at,
        }
    }

    /// Apply one qualifying completion: grape ledger, experience, then streak.
    pub fn harvest(
        &mut self,
        today: NaiveDate,
        focus_minutes: u32,
        extended_tiers: bool,
    ) -> RewardOutcome {
        let harvest = self.ledger.add_grape(extended_tiers);
        let levels_gained = self.level.gain(XP_PER_GRAPE);
        self.streak.record(today);
        self.total_focus_minutes += u64::from(focus_minutes);

        RewardOutcome {
            harvest,
            xp_gained: XP_PER_GRAPE,
            levels_gained,
            level: self.level.level,
            streak_days: self.streak.days,
        }
    }
}
