//! Experience points and leveling.
//!
//! Every qualifying session grants [`XP_PER_GRAPE`]. Advancing from level `L`
//! to `L + 1` costs `floor(100 × 1.5^(L−1))` experience, which is subtracted
//! from the pool on level-up.

use serde::{Deserialize, Serialize};

/// Experience granted per qualifying focus session.
pub const XP_PER_GRAPE: u64 = 10;

const BASE_REQUIREMENT: f64 = 100.0;
const GROWTH: f64 = 1.5;

/// Experience required to advance from `level` to `level + 1`.
pub fn xp_required_for(level: u32) -> u64 {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    let required = (BASE_REQUIREMENT * GROWTH.powi(exponent)).floor();
    // Float-to-int `as` saturates; astronomically high levels cap at u64::MAX.
    required as u64
}

/// Current level and the experience accumulated towards the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub experience: u64,
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
        }
    }
}

impl LevelProgress {
    /// Add experience and apply every pending level-up.
    ///
    /// Returns the number of levels gained.
    pub fn gain(&mut self, xp: u64) -> u32 {
        self.experience = self.experience.saturating_add(xp);
        let mut gained = 0;
        loop {
            let required = xp_required_for(self.level);
            if self.experience < required {
                break;
            }
            self.experience -= required;
            self.level += 1;
            gained += 1;
        }
        gained
    }

    /// Experience still missing for the next level-up.
    pub fn xp_to_next_level(&self) -> u64 {
        xp_required_for(self.level).saturating_sub(self.experience)
    }

    /// 0.0 .. 1.0 progress within the current level.
    pub fn fraction(&self) -> f64 {
        let required = xp_required_for(self.level);
        if required == 0 {
            return 0.0;
        }
        (self.experience as f64 / required as f64).min(1.0)
    }
}
