//! Atomic, invertible state mutations.
//!
//! A [`Change`] is the only legal way to alter [`GameState`] during play.
//! Every variant carries enough data to be performed and to produce its
//! exact inverse without consulting the state again: for all changes `c`
//! and states `s`, `c.invert().perform(c.perform(s))` restores `s`
//! bit-for-bit.
//!
//! Variants that need a before-value (`prev`) capture it at construction
//! through the smart constructors below; [`Change::perform`] then verifies
//! the captured value still matches, surfacing drift as an invariant
//! violation rather than silently corrupting the undo chain.

mod journal;

pub use journal::ChangeJournal;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ids::{PlayerId, RelationshipTypeId, ResourceId, TechId, TerritoryId, UnitId};
use crate::state::{GameState, Unit};

/// An atomic, serializable, invertible mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Insert fully-formed units into a territory.
    AddUnits {
        territory: TerritoryId,
        units: Vec<Unit>,
    },
    /// Remove the given units (captured records) from a territory.
    RemoveUnits {
        territory: TerritoryId,
        units: Vec<Unit>,
    },
    SetTerritoryOwner {
        territory: TerritoryId,
        prev: Option<PlayerId>,
        next: Option<PlayerId>,
    },
    SetUnitOwner {
        unit: UnitId,
        prev: PlayerId,
        next: PlayerId,
    },
    /// Load a unit onto (or off) a transport.
    SetTransport {
        unit: UnitId,
        prev: Option<UnitId>,
        next: Option<UnitId>,
    },
    SetMoved {
        unit: UnitId,
        prev: bool,
        next: bool,
    },
    SetHitDamage {
        unit: UnitId,
        prev: u32,
        next: u32,
    },
    SetBombingDamage {
        unit: UnitId,
        prev: u32,
        next: u32,
    },
    /// Adjust a player's resource balance. Refuses to go negative.
    ResourceDelta {
        player: PlayerId,
        resource: ResourceId,
        delta: i64,
    },
    AddTech {
        player: PlayerId,
        tech: TechId,
    },
    RemoveTech {
        player: PlayerId,
        tech: TechId,
    },
    /// Relabel the relationship between two players. Both directions update
    /// atomically because storage is keyed by the unordered pair.
    SetRelationship {
        a: PlayerId,
        b: PlayerId,
        prev: RelationshipTypeId,
        next: RelationshipTypeId,
    },
    SetConquered {
        territory: TerritoryId,
        prev: bool,
        next: bool,
    },
    /// Adjust the per-turn bombardment damage tracker for a territory.
    TerritoryDamageDelta {
        territory: TerritoryId,
        delta: i64,
    },
    SetEditMode {
        prev: bool,
        next: bool,
    },
    /// Several changes applied in order as one logical action. If a member
    /// fails, the already-performed members are rolled back before the
    /// error surfaces, so a group is all-or-nothing.
    Group(Vec<Change>),
}

fn verify<T: PartialEq + std::fmt::Debug>(
    what: &str,
    expected: &T,
    actual: &T,
) -> Result<(), EngineError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EngineError::invariant(format!(
            "{what}: expected {expected:?}, found {actual:?}"
        )))
    }
}

impl Change {
    // --- capturing constructors ---------------------------------------

    /// Removal of `units` from `territory`, capturing the current records
    /// so the inverse can restore them exactly.
    pub fn remove_units(
        state: &GameState,
        territory: TerritoryId,
        units: &[UnitId],
    ) -> Result<Self, EngineError> {
        let holder = state.territory(territory)?;
        let mut records = Vec::with_capacity(units.len());
        for &id in units {
            if !holder.units.contains(&id) {
                return Err(EngineError::invariant(format!(
                    "{id} is not in {territory}"
                )));
            }
            records.push(state.unit(id)?.clone());
        }
        Ok(Self::RemoveUnits {
            territory,
            units: records,
        })
    }

    pub fn set_territory_owner(
        state: &GameState,
        territory: TerritoryId,
        next: Option<PlayerId>,
    ) -> Result<Self, EngineError> {
        Ok(Self::SetTerritoryOwner {
            territory,
            prev: state.territory(territory)?.owner,
            next,
        })
    }

    pub fn set_unit_owner(
        state: &GameState,
        unit: UnitId,
        next: PlayerId,
    ) -> Result<Self, EngineError> {
        Ok(Self::SetUnitOwner {
            unit,
            prev: state.unit(unit)?.owner,
            next,
        })
    }

    pub fn set_transport(
        state: &GameState,
        unit: UnitId,
        next: Option<UnitId>,
    ) -> Result<Self, EngineError> {
        Ok(Self::SetTransport {
            unit,
            prev: state.unit(unit)?.transported_by,
            next,
        })
    }

    pub fn set_moved(state: &GameState, unit: UnitId, next: bool) -> Result<Self, EngineError> {
        Ok(Self::SetMoved {
            unit,
            prev: state.unit(unit)?.moved_this_turn,
            next,
        })
    }

    pub fn set_hit_damage(
        state: &GameState,
        unit: UnitId,
        next: u32,
    ) -> Result<Self, EngineError> {
        Ok(Self::SetHitDamage {
            unit,
            prev: state.unit(unit)?.hits,
            next,
        })
    }

    pub fn set_bombing_damage(
        state: &GameState,
        unit: UnitId,
        next: u32,
    ) -> Result<Self, EngineError> {
        Ok(Self::SetBombingDamage {
            unit,
            prev: state.unit(unit)?.bombing_damage,
            next,
        })
    }

    pub fn set_relationship(
        state: &GameState,
        a: PlayerId,
        b: PlayerId,
        next: RelationshipTypeId,
    ) -> Self {
        Self::SetRelationship {
            a,
            b,
            prev: state.relationship(a, b),
            next,
        }
    }

    pub fn set_conquered(
        state: &GameState,
        territory: TerritoryId,
        next: bool,
    ) -> Result<Self, EngineError> {
        state.territory(territory)?;
        Ok(Self::SetConquered {
            territory,
            prev: state.conquered_this_turn.contains(&territory),
            next,
        })
    }

    pub fn set_edit_mode(state: &GameState, next: bool) -> Self {
        Self::SetEditMode {
            prev: state.edit_mode,
            next,
        }
    }

    // --- operations ---------------------------------------------------

    /// Applies the mutation. Fails only on invariant violations (§3):
    /// negative resources, inconsistent containment, drifted before-values.
    pub fn perform(&self, state: &mut GameState) -> Result<(), EngineError> {
        match self {
            Change::AddUnits { territory, units } => {
                state.territory(*territory)?;
                for unit in units {
                    if state.units.contains_key(&unit.id) {
                        return Err(EngineError::invariant(format!("{} already exists", unit.id)));
                    }
                }
                for unit in units {
                    state.units.insert(unit.id, unit.clone());
                    state.territory_mut(*territory)?.units.insert(unit.id);
                }
                Ok(())
            }
            Change::RemoveUnits { territory, units } => {
                let holder = state.territory(*territory)?;
                for unit in units {
                    if !holder.units.contains(&unit.id) {
                        return Err(EngineError::invariant(format!(
                            "{} is not in {territory}",
                            unit.id
                        )));
                    }
                }
                for unit in units {
                    state.territory_mut(*territory)?.units.remove(&unit.id);
                    state.units.remove(&unit.id);
                }
                Ok(())
            }
            Change::SetTerritoryOwner {
                territory,
                prev,
                next,
            } => {
                let holder = state.territory_mut(*territory)?;
                verify("territory owner", prev, &holder.owner)?;
                holder.owner = *next;
                Ok(())
            }
            Change::SetUnitOwner { unit, prev, next } => {
                let record = state.unit_mut(*unit)?;
                verify("unit owner", prev, &record.owner)?;
                record.owner = *next;
                Ok(())
            }
            Change::SetTransport { unit, prev, next } => {
                let record = state.unit_mut(*unit)?;
                verify("transport assignment", prev, &record.transported_by)?;
                record.transported_by = *next;
                Ok(())
            }
            Change::SetMoved { unit, prev, next } => {
                let record = state.unit_mut(*unit)?;
                verify("moved flag", prev, &record.moved_this_turn)?;
                record.moved_this_turn = *next;
                Ok(())
            }
            Change::SetHitDamage { unit, prev, next } => {
                let record = state.unit_mut(*unit)?;
                verify("hit damage", prev, &record.hits)?;
                record.hits = *next;
                Ok(())
            }
            Change::SetBombingDamage { unit, prev, next } => {
                let record = state.unit_mut(*unit)?;
                verify("bombing damage", prev, &record.bombing_damage)?;
                record.bombing_damage = *next;
                Ok(())
            }
            Change::ResourceDelta {
                player,
                resource,
                delta,
            } => {
                let current = state.player(*player)?.resource(*resource) as i64;
                let updated = current + delta;
                if updated < 0 {
                    return Err(EngineError::invariant(format!(
                        "{player} would hold {updated} of {resource}"
                    )));
                }
                let updated = u32::try_from(updated).map_err(|_| {
                    EngineError::invariant(format!("{player} balance of {resource} overflows"))
                })?;
                state.player_mut(*player)?.set_resource(*resource, updated);
                Ok(())
            }
            Change::AddTech { player, tech } => {
                let record = state.player_mut(*player)?;
                if !record.techs.insert(*tech) {
                    return Err(EngineError::invariant(format!("{player} already has {tech}")));
                }
                Ok(())
            }
            Change::RemoveTech { player, tech } => {
                let record = state.player_mut(*player)?;
                if !record.techs.remove(tech) {
                    return Err(EngineError::invariant(format!(
                        "{player} does not have {tech}"
                    )));
                }
                Ok(())
            }
            Change::SetRelationship { a, b, prev, next } => {
                let current = state.relationship(*a, *b);
                verify("relationship", prev, &current)?;
                let default = state.data.relationship_types.default_type;
                state.relationships.set(*a, *b, *next, default);
                Ok(())
            }
            Change::SetConquered {
                territory,
                prev,
                next,
            } => {
                let current = state.conquered_this_turn.contains(territory);
                verify("conquered flag", prev, &current)?;
                if *next {
                    state.conquered_this_turn.insert(*territory);
                } else {
                    state.conquered_this_turn.remove(territory);
                }
                Ok(())
            }
            Change::TerritoryDamageDelta { territory, delta } => {
                let current = state.territory_damage_this_turn(*territory) as i64;
                let updated = current + delta;
                if updated < 0 {
                    return Err(EngineError::invariant(format!(
                        "damage tracker for {territory} would be {updated}"
                    )));
                }
                let updated = u32::try_from(updated).map_err(|_| {
                    EngineError::invariant(format!("damage tracker for {territory} overflows"))
                })?;
                state.set_territory_damage_this_turn(*territory, updated);
                Ok(())
            }
            Change::SetEditMode { prev, next } => {
                verify("edit mode", prev, &state.edit_mode)?;
                state.edit_mode = *next;
                Ok(())
            }
            Change::Group(members) => {
                for (index, member) in members.iter().enumerate() {
                    if let Err(error) = member.perform(state) {
                        // Unwind the performed prefix so the group is
                        // all-or-nothing.
                        for performed in members[..index].iter().rev() {
                            if let Err(rollback) = performed.invert().perform(state) {
                                tracing::error!(?rollback, "rollback of change group failed");
                            }
                        }
                        return Err(error);
                    }
                }
                Ok(())
            }
        }
    }

    /// The exact inverse. Pure; never touches state.
    pub fn invert(&self) -> Change {
        match self {
            Change::AddUnits { territory, units } => Change::RemoveUnits {
                territory: *territory,
                units: units.clone(),
            },
            Change::RemoveUnits { territory, units } => Change::AddUnits {
                territory: *territory,
                units: units.clone(),
            },
            Change::SetTerritoryOwner {
                territory,
                prev,
                next,
            } => Change::SetTerritoryOwner {
                territory: *territory,
                prev: *next,
                next: *prev,
            },
            Change::SetUnitOwner { unit, prev, next } => Change::SetUnitOwner {
                unit: *unit,
                prev: *next,
                next: *prev,
            },
            Change::SetTransport { unit, prev, next } => Change::SetTransport {
                unit: *unit,
                prev: *next,
                next: *prev,
            },
            Change::SetMoved { unit, prev, next } => Change::SetMoved {
                unit: *unit,
                prev: *next,
                next: *prev,
            },
            Change::SetHitDamage { unit, prev, next } => Change::SetHitDamage {
                unit: *unit,
                prev: *next,
                next: *prev,
            },
            Change::SetBombingDamage { unit, prev, next } => Change::SetBombingDamage {
                unit: *unit,
                prev: *next,
                next: *prev,
            },
            Change::ResourceDelta {
                player,
                resource,
                delta,
            } => Change::ResourceDelta {
                player: *player,
                resource: *resource,
                delta: -delta,
            },
            Change::AddTech { player, tech } => Change::RemoveTech {
                player: *player,
                tech: *tech,
            },
            Change::RemoveTech { player, tech } => Change::AddTech {
                player: *player,
                tech: *tech,
            },
            Change::SetRelationship { a, b, prev, next } => Change::SetRelationship {
                a: *a,
                b: *b,
                prev: *next,
                next: *prev,
            },
            Change::SetConquered {
                territory,
                prev,
                next,
            } => Change::SetConquered {
                territory: *territory,
                prev: *next,
                next: *prev,
            },
            Change::TerritoryDamageDelta { territory, delta } => Change::TerritoryDamageDelta {
                territory: *territory,
                delta: -delta,
            },
            Change::SetEditMode { prev, next } => Change::SetEditMode {
                prev: *next,
                next: *prev,
            },
            Change::Group(members) => {
                Change::Group(members.iter().rev().map(Change::invert).collect())
            }
        }
    }
}
