//! Players, resource balances, and per-player technology.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, ResourceId, TechId};

/// Per-player bombardment technology parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechProfile {
    /// Maximum route length of a bombardment attack.
    pub bombard_range: u32,
    /// Cap on attack rolls contributed by a single origin territory.
    pub max_attacks_per_territory: u32,
    /// Dice contributed per eligible attacking unit.
    pub dice_per_attacker: u32,
}

impl Default for TechProfile {
    fn default() -> Self {
        Self {
            bombard_range: 3,
            max_attacks_per_territory: 1,
            dice_per_attacker: 1,
        }
    }
}

/// A participating player.
///
/// Resource balances are non-negative by construction: the only mutation
/// path is [`crate::change::Change::ResourceDelta`], which refuses to drive
/// a balance below zero. Zero balances are not stored, so state comparison
/// is exact after any add/remove round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    resources: BTreeMap<ResourceId, u32>,
    pub techs: BTreeSet<TechId>,
    pub tech_profile: TechProfile,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            resources: BTreeMap::new(),
            techs: BTreeSet::new(),
            tech_profile: TechProfile::default(),
        }
    }

    pub fn resource(&self, resource: ResourceId) -> u32 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    /// Setup-time balance assignment; play-time mutation goes through Changes.
    pub fn with_resource(mut self, resource: ResourceId, quantity: u32) -> Self {
        self.set_resource(resource, quantity);
        self
    }

    pub(crate) fn set_resource(&mut self, resource: ResourceId, quantity: u32) {
        if quantity == 0 {
            self.resources.remove(&resource);
        } else {
            self.resources.insert(resource, quantity);
        }
    }
}

/// Registry of resource kinds, indexed by [`ResourceId`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    names: Vec<String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>) -> ResourceId {
        let id = ResourceId(self.names.len() as u32);
        self.names.push(name.into());
        id
    }

    pub fn name(&self, id: ResourceId) -> &str {
        self.names
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("unknown resource")
    }
}
