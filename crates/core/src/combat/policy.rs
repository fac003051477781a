//! Dice policy for bombardment damage.
//!
//! Two independent axes of variation compose here: the bonus formula
//! (unit-specific maximum die sides plus a flat bonus, versus the map's
//! default die) and reduced-luck rescaling (a high-sided die traded for a
//! smaller die plus a deterministic flat addition, preserving expected
//! value while shrinking variance).
//!
//! The map-default path and the per-unit path deliberately use separate
//! rescaling rules: the former always rescales, the latter only for dice
//! of five or more sides. They are tested separately and must not be
//! unified.

use crate::config::RuleVariants;
use crate::state::UnitTypeData;

/// How one bombardment rolls its dice: a die size plus a flat bonus added
/// to every die. `sides == 0` means no dice are drawn at all and each
/// attack deals the flat bonus outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollPlan {
    pub sides: u32,
    pub flat_bonus: u32,
}

impl RollPlan {
    /// Raw damage from zero-based rolls: each die contributes its one-based
    /// value plus the flat bonus.
    pub fn raw_cost(&self, rolls: &[u32]) -> u32 {
        rolls.iter().map(|roll| roll + self.flat_bonus + 1).sum()
    }

    /// Damage when no dice are drawn.
    pub fn diceless_cost(&self, attacks: u32) -> u32 {
        self.flat_bonus * attacks
    }

    /// One-based displayed value of each die including the bonus.
    pub fn displayed(&self, rolls: &[u32]) -> Vec<u32> {
        rolls.iter().map(|roll| roll + self.flat_bonus + 1).collect()
    }

    /// Expected-value key used to pick the best plan among attackers.
    fn strength(&self) -> u32 {
        self.flat_bonus + (self.sides + 1) / 2
    }
}

/// Plan for rolls on the map's default die, without any unit bonus.
pub fn map_default_plan(variants: &RuleVariants) -> RollPlan {
    if variants.reduced_luck {
        let rescaled = (variants.dice_sides + 1) / 3;
        RollPlan {
            sides: rescaled,
            flat_bonus: rescaled,
        }
    } else {
        RollPlan {
            sides: variants.dice_sides,
            flat_bonus: 0,
        }
    }
}

/// Plan for one unit type under the bonus formula. Unset values fall back
/// to the map's dice with no bonus.
fn unit_plan(variants: &RuleVariants, data: &UnitTypeData) -> RollPlan {
    let mut sides = data.bombing_max_die_sides.unwrap_or(variants.dice_sides);
    let mut bonus = data.bombing_bonus.unwrap_or(0);
    if variants.reduced_luck && sides >= 5 {
        bonus += (sides + 1) / 3;
        sides = (sides + 1) / 3;
    }
    RollPlan {
        sides,
        flat_bonus: bonus,
    }
}

/// Only one roll is taken per strike, so among several attackers the single
/// best-bonus unit is selected by expected value.
pub fn best_bonus_plan<'a>(
    variants: &RuleVariants,
    attackers: impl IntoIterator<Item = &'a UnitTypeData>,
) -> RollPlan {
    let mut best = RollPlan {
        sides: 0,
        flat_bonus: 0,
    };
    for data in attackers {
        let plan = unit_plan(variants, data);
        if plan.strength() > best.strength() {
            best = plan;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Domain;

    fn variants(reduced_luck: bool) -> RuleVariants {
        RuleVariants {
            reduced_luck,
            use_bombing_bonus: true,
            ..RuleVariants::default()
        }
    }

    fn bomber(sides: u32, bonus: u32) -> UnitTypeData {
        UnitTypeData::new("bomber", Domain::Air)
            .bombards()
            .bombing_profile(sides, bonus)
    }

    #[test]
    fn raw_cost_is_one_based_plus_bonus() {
        let plan = RollPlan {
            sides: 6,
            flat_bonus: 0,
        };
        assert_eq!(plan.raw_cost(&[2]), 3);
        assert_eq!(plan.raw_cost(&[0, 5]), 7);

        let bonus = RollPlan {
            sides: 6,
            flat_bonus: 2,
        };
        assert_eq!(bonus.raw_cost(&[2]), 5);
    }

    #[test]
    fn map_default_reduced_luck_rescales_unconditionally() {
        let plan = map_default_plan(&variants(true));
        assert_eq!(plan.sides, 2);
        assert_eq!(plan.flat_bonus, 2);
    }

    #[test]
    fn unit_reduced_luck_rescales_only_from_five_sides() {
        // max die sides 6 -> d2 plus a flat 2.
        let plan = best_bonus_plan(&variants(true), [&bomber(6, 0)]);
        assert_eq!(
            plan,
            RollPlan {
                sides: 2,
                flat_bonus: 2
            }
        );

        // A d4 keeps its die untouched.
        let plan = best_bonus_plan(&variants(true), [&bomber(4, 1)]);
        assert_eq!(
            plan,
            RollPlan {
                sides: 4,
                flat_bonus: 1
            }
        );
    }

    #[test]
    fn rescaling_applies_to_every_candidate_before_selection() {
        // d12+0 rescales to d4+4 (strength 6); d4+3 stays (strength 5).
        let heavy = bomber(12, 0);
        let light = bomber(4, 3);
        let plan = best_bonus_plan(&variants(true), [&heavy, &light]);
        assert_eq!(
            plan,
            RollPlan {
                sides: 4,
                flat_bonus: 4
            }
        );
    }

    #[test]
    fn best_bonus_prefers_higher_expected_value() {
        // d6+2 (strength 5) beats d6+0 (strength 3).
        let strong = bomber(6, 2);
        let weak = bomber(6, 0);
        let plan = best_bonus_plan(&variants(false), [&weak, &strong]);
        assert_eq!(
            plan,
            RollPlan {
                sides: 6,
                flat_bonus: 2
            }
        );
    }

    #[test]
    fn unset_profile_falls_back_to_map_dice() {
        let plain = UnitTypeData::new("launcher", Domain::Land).bombards();
        let plan = best_bonus_plan(&variants(false), [&plain]);
        assert_eq!(
            plan,
            RollPlan {
                sides: 6,
                flat_bonus: 0
            }
        );
    }
}
