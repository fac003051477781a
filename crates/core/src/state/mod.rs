//! Authoritative game state.
//!
//! [`GameState`] is the single aggregate every rule reads and every
//! [`crate::change::Change`] mutates. [`GameData`] bundles the explicit
//! registries (unit types, resources, relationship types, user actions) and
//! the map topology; it travels inside the state so the engine can be
//! instantiated any number of times without global lookups.

mod actions;
pub mod fixtures;
mod lock;
mod map;
mod player;
mod relationship;
mod unit;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use actions::{ActionEffect, UserActionDefinition, UserActionRegistry};
pub use lock::StateLock;
pub use map::{GameMap, Territory};
pub use player::{Player, ResourceRegistry, TechProfile};
pub use relationship::{
    RelationshipKind, RelationshipState, RelationshipTypeData, RelationshipTypeRegistry,
};
pub use unit::{Domain, Unit, UnitTypeData, UnitTypeRegistry};

use crate::config::RuleVariants;
use crate::error::EngineError;
use crate::ids::{PlayerId, RelationshipTypeId, TerritoryId, UnitId};

/// Static registries and map topology, fixed after setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    pub unit_types: UnitTypeRegistry,
    pub resources: ResourceRegistry,
    /// The resource bombardment damage is charged against.
    pub primary_resource: crate::ids::ResourceId,
    pub relationship_types: RelationshipTypeRegistry,
    pub user_actions: UserActionRegistry,
    pub map: GameMap,
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            unit_types: UnitTypeRegistry::new(),
            resources: ResourceRegistry::new(),
            primary_resource: crate::ids::ResourceId(0),
            relationship_types: RelationshipTypeRegistry::new("peace", RelationshipKind::Peace),
            user_actions: UserActionRegistry::new(),
            map: GameMap::new(),
        }
    }
}

/// Canonical snapshot of the simulation.
///
/// During play this is mutated exclusively by performing Changes; the setup
/// helpers below exist for building the initial state and test fixtures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub data: GameData,
    pub variants: RuleVariants,
    pub territories: BTreeMap<TerritoryId, Territory>,
    pub units: BTreeMap<UnitId, Unit>,
    pub players: BTreeMap<PlayerId, Player>,
    pub relationships: RelationshipState,
    /// Whether the edit phase accepts state-altering commands.
    pub edit_mode: bool,
    /// Territories conquered this turn; conquered territories cannot launch
    /// bombardments.
    pub conquered_this_turn: BTreeSet<TerritoryId>,
    /// Bombardment damage already inflicted per territory this turn.
    /// Tracked as state (not delegate-local) so replay reproduces it.
    territory_damage_this_turn: BTreeMap<TerritoryId, u32>,
}

impl GameState {
    pub fn new(data: GameData, variants: RuleVariants) -> Self {
        Self {
            data,
            variants,
            territories: BTreeMap::new(),
            units: BTreeMap::new(),
            players: BTreeMap::new(),
            relationships: RelationshipState::default(),
            edit_mode: false,
            conquered_this_turn: BTreeSet::new(),
            territory_damage_this_turn: BTreeMap::new(),
        }
    }

    // --- lookups ------------------------------------------------------

    pub fn territory(&self, id: TerritoryId) -> Result<&Territory, EngineError> {
        self.territories
            .get(&id)
            .ok_or_else(|| EngineError::invariant(format!("unknown {id}")))
    }

    pub(crate) fn territory_mut(&mut self, id: TerritoryId) -> Result<&mut Territory, EngineError> {
        self.territories
            .get_mut(&id)
            .ok_or_else(|| EngineError::invariant(format!("unknown {id}")))
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit, EngineError> {
        self.units
            .get(&id)
            .ok_or_else(|| EngineError::invariant(format!("unknown {id}")))
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, EngineError> {
        self.units
            .get_mut(&id)
            .ok_or_else(|| EngineError::invariant(format!("unknown {id}")))
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, EngineError> {
        self.players
            .get(&id)
            .ok_or_else(|| EngineError::invariant(format!("unknown {id}")))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, EngineError> {
        self.players
            .get_mut(&id)
            .ok_or_else(|| EngineError::invariant(format!("unknown {id}")))
    }

    /// Capabilities of a unit's type. A missing registry entry is a setup
    /// bug, so this resolves through [`EngineError::Invariant`].
    pub fn unit_type(&self, unit: &Unit) -> Result<&UnitTypeData, EngineError> {
        self.data
            .unit_types
            .get(unit.unit_type)
            .ok_or_else(|| EngineError::invariant(format!("unregistered {}", unit.unit_type)))
    }

    // --- relationships ------------------------------------------------

    pub fn relationship(&self, a: PlayerId, b: PlayerId) -> RelationshipTypeId {
        self.relationships
            .get(a, b, self.data.relationship_types.default_type)
    }

    pub fn at_war(&self, a: PlayerId, b: PlayerId) -> bool {
        a != b
            && self.data.relationship_types.kind(self.relationship(a, b)) == RelationshipKind::War
    }

    pub fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b
            || self.data.relationship_types.kind(self.relationship(a, b))
                == RelationshipKind::Allied
    }

    // --- per-turn trackers --------------------------------------------

    pub fn territory_damage_this_turn(&self, territory: TerritoryId) -> u32 {
        self.territory_damage_this_turn
            .get(&territory)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn set_territory_damage_this_turn(&mut self, territory: TerritoryId, value: u32) {
        if value == 0 {
            self.territory_damage_this_turn.remove(&territory);
        } else {
            self.territory_damage_this_turn.insert(territory, value);
        }
    }

    // --- setup helpers ------------------------------------------------

    /// Registers a player. Setup only.
    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Registers a territory. Setup only.
    pub fn add_territory(&mut self, territory: Territory) {
        self.territories.insert(territory.id, territory);
    }

    /// Spawns a unit directly into a territory. Setup only; play-time unit
    /// creation goes through [`crate::change::Change::AddUnits`].
    pub fn spawn_unit(
        &mut self,
        territory: TerritoryId,
        unit_type: crate::ids::UnitTypeId,
        owner: PlayerId,
    ) -> Result<UnitId, EngineError> {
        let id = self.next_unit_id();
        let unit = Unit::new(id, unit_type, owner);
        self.territory_mut(territory)?.units.insert(id);
        self.units.insert(id, unit);
        Ok(id)
    }

    /// First unused unit id, derived from the unit table so it needs no
    /// separate allocator field that undo would have to restore.
    pub fn next_unit_id(&self) -> UnitId {
        UnitId(
            self.units
                .last_key_value()
                .map(|(id, _)| id.0 + 1)
                .unwrap_or(0),
        )
    }

    /// The territory containing a unit, if any.
    pub fn territory_of(&self, unit: UnitId) -> Option<TerritoryId> {
        self.territories
            .values()
            .find(|territory| territory.units.contains(&unit))
            .map(|territory| territory.id)
    }

    /// Remaining transport capacity of a unit, given its type's capacity and
    /// the loads currently assigned to it.
    pub fn free_transport_capacity(&self, transport: UnitId) -> Result<u32, EngineError> {
        let data = self.unit_type(self.unit(transport)?)?;
        let mut free = data.transport_capacity;
        for unit in self.units.values() {
            if unit.transported_by == Some(transport) {
                let cost = self.unit_type(unit)?.transport_cost;
                free = free.saturating_sub(cost);
            }
        }
        Ok(free)
    }
}
