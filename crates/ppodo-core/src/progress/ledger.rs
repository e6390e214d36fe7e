//! Grape ledger: tiered rollover of the base currency.
//!
//! One qualifying focus session earns one grape. Ten grapes complete a bunch,
//! ten bunches complete a box. With the extended tiers enabled, ten boxes
//! complete a bottle and ten bottles complete a crate.
//!
//! The ledger is pure arithmetic; persisting it (together with the day's
//! [`HarvestOutcome`]) in one transaction is the storage layer's job.

use serde::{Deserialize, Serialize};

/// Units of tier K needed to complete one unit of tier K+1.
pub const TIER_CAPACITY: u32 = 10;

/// Running totals and fill counters of every collection tier.
///
/// Invariant: every `*_fill` counter stays in `0..TIER_CAPACITY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrapeLedger {
    pub total_grapes: u64,
    pub total_bunches: u64,
    pub total_boxes: u64,
    pub total_bottles: u64,
    pub total_crates: u64,
    /// Grapes in the bunch currently being filled.
    pub bunch_fill: u32,
    /// Bunches in the box currently being filled.
    pub box_fill: u32,
    /// Boxes in the bottle currently being filled (extended tiers only).
    pub bottle_fill: u32,
    /// Bottles in the crate currently being filled (extended tiers only).
    pub crate_fill: u32,
}

/// Which tiers rolled over while adding a single grape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestOutcome {
    pub bunch_completed: bool,
    pub box_completed: bool,
    pub bottle_completed: bool,
    pub crate_completed: bool,
}

impl HarvestOutcome {
    /// `1` if a bunch rolled over, for the daily counters.
    pub fn bunches(&self) -> u32 {
        u32::from(self.bunch_completed)
    }

    pub fn boxes(&self) -> u32 {
        u32::from(self.box_completed)
    }
}

/// Increment `fill`; on reaching capacity reset it and report a rollover.
fn fill_one(fill: &mut u32) -> bool {
    *fill += 1;
    if *fill >= TIER_CAPACITY {
        *fill = 0;
        true
    } else {
        false
    }
}

impl GrapeLedger {
    /// Add one grape and roll every tier forward.
    ///
    /// `extended_tiers` lets a completed box cascade into the bottle and
    /// crate tiers; without it the box tier is the last one.
    pub fn add_grape(&mut self, extended_tiers: bool) -> HarvestOutcome {
        let mut outcome = HarvestOutcome::default();

        self.total_grapes += 1;
        if !fill_one(&mut self.bunch_fill) {
            return outcome;
        }
        outcome.bunch_completed = true;
        self.total_bunches += 1;

        if !fill_one(&mut self.box_fill) {
            return outcome;
        }
        outcome.box_completed = true;
        self.total_boxes += 1;

        if !extended_tiers || !fill_one(&mut self.bottle_fill) {
            return outcome;
        }
        outcome.bottle_completed = true;
        self.total_bottles += 1;

        if fill_one(&mut self.crate_fill) {
            outcome.crate_completed = true;
            self.total_crates += 1;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn harvest(n: u64, extended: bool) -> GrapeLedger {
        let mut ledger = GrapeLedger::default();
        for _ in 0..n {
            ledger.add_grape(extended);
        }
        ledger
    }

    #[test]
    fn first_grape_fills_the_bunch() {
        let mut ledger = GrapeLedger::default();
        let outcome = ledger.add_grape(false);
        assert_eq!(outcome, HarvestOutcome::default());
        assert_eq!(ledger.total_grapes, 1);
        assert_eq!(ledger.bunch_fill, 1);
        assert_eq!(ledger.total_bunches, 0);
    }

    #[test]
    fn tenth_grape_completes_a_bunch() {
        let mut ledger = harvest(9, false);
        let outcome = ledger.add_grape(false);
        assert!(outcome.bunch_completed);
        assert!(!outcome.box_completed);
        assert_eq!(outcome.bunches(), 1);
        assert_eq!(ledger.bunch_fill, 0);
        assert_eq!(ledger.total_bunches, 1);
        assert_eq!(ledger.box_fill, 1);
    }

    #[test]
    fn hundredth_grape_completes_a_box() {
        let mut ledger = harvest(99, false);
        let outcome = ledger.add_grape(false);
        assert!(outcome.bunch_completed);
        assert!(outcome.box_completed);
        assert_eq!(ledger.total_boxes, 1);
        assert_eq!(ledger.total_bunches, 10);
        assert_eq!(ledger.box_fill, 0);
        assert_eq!(ledger.bunch_fill, 0);
    }

    #[test]
    fn boxes_do_not_cascade_without_extended_tiers() {
        let ledger = harvest(1_000, false);
        assert_eq!(ledger.total_boxes, 10);
        assert_eq!(ledger.total_bottles, 0);
        assert_eq!(ledger.bottle_fill, 0);
    }

    #[test]
    fn extended_tiers_cascade_into_bottles() {
        let mut ledger = harvest(999, true);
        let outcome = ledger.add_grape(true);
        assert!(outcome.bottle_completed);
        assert!(!outcome.crate_completed);
        assert_eq!(ledger.total_bottles, 1);
        assert_eq!(ledger.crate_fill, 1);
        assert_eq!(ledger.bottle_fill, 0);
    }

    #[test]
    fn extended_tiers_reach_a_crate() {
        let ledger = harvest(10_000, true);
        assert_eq!(ledger.total_crates, 1);
        assert_eq!(ledger.total_bottles, 10);
        assert_eq!(ledger.crate_fill, 0);
    }

    proptest! {
        #[test]
        fn totals_follow_division_by_ten(n in 0u64..2_500) {
            let ledger = harvest(n, false);
            prop_assert_eq!(ledger.total_grapes, n);
            prop_assert_eq!(ledger.total_bunches, n / 10);
            prop_assert_eq!(u64::from(ledger.bunch_fill), n % 10);
            prop_assert_eq!(ledger.total_boxes, n / 100);
            prop_assert_eq!(u64::from(ledger.box_fill), (n / 10) % 10);
        }

        #[test]
        fn fills_stay_below_capacity(n in 0u64..3_000, extended in any::<bool>()) {
            let ledger = harvest(n, extended);
            prop_assert!(ledger.bunch_fill < TIER_CAPACITY);
            prop_assert!(ledger.box_fill < TIER_CAPACITY);
            prop_assert!(ledger.bottle_fill < TIER_CAPACITY);
            prop_assert!(ledger.crate_fill < TIER_CAPACITY);
        }
    }
}
