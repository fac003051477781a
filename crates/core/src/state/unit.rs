//! Units and the unit-type registry.

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, UnitId, UnitTypeId};

/// Which movement domain a unit type belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Land,
    Sea,
    Air,
}

/// A unit instance.
///
/// A unit is owned by exactly one territory at a time; transfer between
/// territories is a [`crate::change::Change`]. The transient flags reset at
/// turn boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: UnitTypeId,
    pub owner: PlayerId,
    /// Accumulated combat hit damage.
    pub hits: u32,
    /// Accumulated bombardment damage.
    pub bombing_damage: u32,
    pub moved_this_turn: bool,
    pub disabled: bool,
    pub submerged: bool,
    /// The transport carrying this unit, if any.
    pub transported_by: Option<UnitId>,
}

impl Unit {
    pub fn new(id: UnitId, unit_type: UnitTypeId, owner: PlayerId) -> Self {
        Self {
            id,
            unit_type,
            owner,
            hits: 0,
            bombing_damage: 0,
            moved_this_turn: false,
            disabled: false,
            submerged: false,
            transported_by: None,
        }
    }
}

/// Capabilities of a unit type.
///
/// Types are registered once at setup; there is no global lookup — the
/// registry travels with the game data and is indexed by [`UnitTypeId`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeData {
    pub name: String,
    pub domain: Domain,
    /// Whether this type can perform ranged bombardment attacks.
    pub can_bombard: bool,
    pub can_be_transported: bool,
    /// Capacity consumed when loaded onto a transport.
    pub transport_cost: u32,
    /// Carrying capacity when acting as a transport; zero for non-transports.
    pub transport_capacity: u32,
    /// Whether bombardment damage can be applied to this type at all.
    pub can_be_damaged: bool,
    /// Bombing damage capacity; `None` means the type tracks no damage cap.
    pub max_bombing_damage: Option<u32>,
    /// Whether the unit is destroyed on reaching its damage cap.
    pub dies_at_max_damage: bool,
    /// Infrastructure transfers with territory ownership.
    pub is_infrastructure: bool,
    /// Unit-specific maximum die sides for the bombing bonus formula.
    /// `None` falls back to the map's default dice.
    pub bombing_max_die_sides: Option<u32>,
    /// Flat bonus added to each bombing die under the bonus formula.
    pub bombing_bonus: Option<u32>,
}

impl UnitTypeData {
    /// A plain type with no special capabilities; builder-style setters
    /// below toggle the rest.
    pub fn new(name: impl Into<String>, domain: Domain) -> Self {
        Self {
            name: name.into(),
            domain,
            can_bombard: false,
            can_be_transported: false,
            transport_cost: 1,
            transport_capacity: 0,
            can_be_damaged: false,
            max_bombing_damage: None,
            dies_at_max_damage: false,
            is_infrastructure: false,
            bombing_max_die_sides: None,
            bombing_bonus: None,
        }
    }

    pub fn bombards(mut self) -> Self {
        self.can_bombard = true;
        self
    }

    pub fn transportable(mut self, cost: u32) -> Self {
        self.can_be_transported = true;
        self.transport_cost = cost;
        self
    }

    pub fn transports(mut self, capacity: u32) -> Self {
        self.transport_capacity = capacity;
        self
    }

    pub fn damageable(mut self, max: u32) -> Self {
        self.can_be_damaged = true;
        self.max_bombing_damage = Some(max);
        self
    }

    pub fn dies_at_max(mut self) -> Self {
        self.dies_at_max_damage = true;
        self
    }

    pub fn infrastructure(mut self) -> Self {
        self.is_infrastructure = true;
        self
    }

    pub fn bombing_profile(mut self, max_die_sides: u32, bonus: u32) -> Self {
        self.bombing_max_die_sides = Some(max_die_sides);
        self.bombing_bonus = Some(bonus);
        self
    }

    /// Remaining bombing damage this type can absorb given current damage.
    pub fn remaining_damage_capacity(&self, current: u32) -> u32 {
        self.max_bombing_damage
            .map(|max| max.saturating_sub(current))
            .unwrap_or(u32::MAX)
    }
}

/// Registry of unit types, indexed by [`UnitTypeId`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeRegistry {
    types: Vec<UnitTypeData>,
}

impl UnitTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, data: UnitTypeData) -> UnitTypeId {
        let id = UnitTypeId(self.types.len() as u32);
        self.types.push(data);
        id
    }

    pub fn get(&self, id: UnitTypeId) -> Option<&UnitTypeData> {
        self.types.get(id.0 as usize)
    }
}
