//! Relationships between players.
//!
//! A relationship is an edge label on an unordered pair of players. Storage
//! normalizes the pair, so a change is observable identically from either
//! player's perspective by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, RelationshipTypeId};

/// Broad behavior class of a relationship type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    War,
    Peace,
    Allied,
}

/// A named relationship type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTypeData {
    pub name: String,
    pub kind: RelationshipKind,
}

/// Registry of relationship types plus the default assumed for pairs with
/// no explicit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTypeRegistry {
    types: Vec<RelationshipTypeData>,
    pub default_type: RelationshipTypeId,
}

impl RelationshipTypeRegistry {
    /// Creates a registry seeded with the default type every unlisted pair
    /// holds.
    pub fn new(default_name: impl Into<String>, default_kind: RelationshipKind) -> Self {
        Self {
            types: vec![RelationshipTypeData {
                name: default_name.into(),
                kind: default_kind,
            }],
            default_type: RelationshipTypeId(0),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: RelationshipKind,
    ) -> RelationshipTypeId {
        let id = RelationshipTypeId(self.types.len() as u32);
        self.types.push(RelationshipTypeData {
            name: name.into(),
            kind,
        });
        id
    }

    pub fn get(&self, id: RelationshipTypeId) -> Option<&RelationshipTypeData> {
        self.types.get(id.0 as usize)
    }

    pub fn kind(&self, id: RelationshipTypeId) -> RelationshipKind {
        self.get(id)
            .map(|data| data.kind)
            .unwrap_or(RelationshipKind::Peace)
    }
}

/// Current relationship assignments, keyed by normalized player pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipState {
    pairs: BTreeMap<(PlayerId, PlayerId), RelationshipTypeId>,
}

fn pair_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl RelationshipState {
    pub fn get(
        &self,
        a: PlayerId,
        b: PlayerId,
        default: RelationshipTypeId,
    ) -> RelationshipTypeId {
        self.pairs.get(&pair_key(a, b)).copied().unwrap_or(default)
    }

    /// Stores the assignment; pairs at the default type are removed rather
    /// than stored, so applying a change and its inverse restores the map
    /// bit-for-bit.
    pub(crate) fn set(
        &mut self,
        a: PlayerId,
        b: PlayerId,
        relationship: RelationshipTypeId,
        default: RelationshipTypeId,
    ) {
        if relationship == default {
            self.pairs.remove(&pair_key(a, b));
        } else {
            self.pairs.insert(pair_key(a, b), relationship);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_is_symmetric() {
        let mut registry = RelationshipTypeRegistry::new("peace", RelationshipKind::Peace);
        let war = registry.register("war", RelationshipKind::War);
        let mut state = RelationshipState::default();
        let (a, b) = (PlayerId(3), PlayerId(1));

        state.set(a, b, war, registry.default_type);
        assert_eq!(state.get(a, b, registry.default_type), war);
        assert_eq!(state.get(b, a, registry.default_type), war);
    }

    #[test]
    fn unlisted_pairs_fall_back_to_default() {
        let registry = RelationshipTypeRegistry::new("peace", RelationshipKind::Peace);
        let state = RelationshipState::default();
        assert_eq!(
            state.get(PlayerId(0), PlayerId(1), registry.default_type),
            registry.default_type
        );
    }
}
