//! Newtype identities for the simulated entities.
//!
//! Every entity is referenced by a `u32` newtype rather than by pointer or
//! name, so the state store can be cloned, serialized, and diffed cheaply.
//! Registries and state tables are keyed by these ids.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// A territory on the map.
    TerritoryId,
    "territory#"
);
entity_id!(
    /// A unit instance. Ids are unique for the life of a session and never reused.
    UnitId,
    "unit#"
);
entity_id!(
    /// A participating player.
    PlayerId,
    "player#"
);
entity_id!(
    /// A unit type in the [`crate::state::UnitTypeRegistry`].
    UnitTypeId,
    "unit-type#"
);
entity_id!(
    /// A resource kind (production points, tech tokens, ...).
    ResourceId,
    "resource#"
);
entity_id!(
    /// A technology advance.
    TechId,
    "tech#"
);
entity_id!(
    /// A relationship type (war, peace, alliance, ...).
    RelationshipTypeId,
    "relationship#"
);
entity_id!(
    /// A user-action definition.
    ActionId,
    "action#"
);

/// A reference to any entity, used to annotate history events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    Territory(TerritoryId),
    Unit(UnitId),
    Player(PlayerId),
}

impl From<TerritoryId> for EntityRef {
    fn from(id: TerritoryId) -> Self {
        Self::Territory(id)
    }
}

impl From<UnitId> for EntityRef {
    fn from(id: UnitId) -> Self {
        Self::Unit(id)
    }
}

impl From<PlayerId> for EntityRef {
    fn from(id: PlayerId) -> Self {
        Self::Player(id)
    }
}
