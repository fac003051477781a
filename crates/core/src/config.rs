//! Rule-variant flags.
//!
//! Every alternate ruleset branch in the engine is driven by a flag here.
//! The set is plain data so it serializes with the rest of the game setup
//! and can be inspected by tooling.

use serde::{Deserialize, Serialize};

/// Named rule-variant switches altering how the engine computes outcomes.
///
/// Defaults correspond to the classic ruleset: one collective bombardment
/// per turn, damage applied to the owning player's resources, full-luck
/// dice, no bonus formula.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVariants {
    /// Number of sides on the map's default die.
    pub dice_sides: u32,

    /// Each eligible origin territory selects its own bombardment target.
    /// When false, all origins contribute to a single collective attack
    /// with one shared target for the whole turn.
    pub per_launcher_targeting: bool,

    /// A territory may only be bombarded once per turn.
    /// Only meaningful with `per_launcher_targeting`.
    pub one_attack_per_territory: bool,

    /// Bombardment range searches may route through impassable territories.
    pub rockets_cross_impassable: bool,

    /// Bombardment damage is applied to an individual unit instead of the
    /// territory owner's resource balance.
    pub bombing_damages_units: bool,

    /// Clamp territory damage to the territory's production value.
    pub limit_damage_to_production: bool,

    /// When clamping to production, first deduct damage already inflicted
    /// on the territory this turn.
    pub deduct_prior_damage: bool,

    /// Rescale high-sided dice into a smaller die plus a flat addition,
    /// preserving expected value while reducing variance.
    pub reduced_luck: bool,

    /// Use unit-specific maximum die sides and flat bonus instead of the
    /// map's default die.
    pub use_bombing_bonus: bool,

    /// Multiplier applied to territory damage before deducting resources.
    pub resource_multiplier: u32,
}

impl Default for RuleVariants {
    fn default() -> Self {
        Self {
            dice_sides: 6,
            per_launcher_targeting: false,
            one_attack_per_territory: true,
            rockets_cross_impassable: false,
            bombing_damages_units: false,
            limit_damage_to_production: false,
            deduct_prior_damage: false,
            reduced_luck: false,
            use_bombing_bonus: false,
            resource_multiplier: 1,
        }
    }
}
