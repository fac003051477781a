//! Definitions of attempt-limited player actions.
//!
//! These are data: the rules for attempting them live in
//! [`crate::phase::user_action`].

use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, PlayerId, RelationshipTypeId, ResourceId};

/// State mutation granted when a user action succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionEffect {
    /// Move the relationship between two players to a new type.
    SetRelationship {
        a: PlayerId,
        b: PlayerId,
        new_type: RelationshipTypeId,
    },
    /// Grant a resource quantity to a player.
    GrantResource {
        player: PlayerId,
        resource: ResourceId,
        amount: u32,
    },
}

/// An action a player may attempt a limited number of times per round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActionDefinition {
    pub name: String,
    /// The player allowed to attempt this action.
    pub owner: PlayerId,
    /// Cost charged per attempt, in `cost_resource`.
    pub cost: u32,
    pub cost_resource: ResourceId,
    /// The attempt succeeds when a die roll (1-based) is at most this value.
    /// A target at or above the die size always succeeds; zero always fails.
    pub chance_to_hit: u32,
    /// Sides of the chance die; zero skips the roll entirely.
    pub chance_dice_sides: u32,
    pub attempts_per_round: u32,
    /// Players who must each accept before the effects apply.
    pub accept_by: Vec<PlayerId>,
    pub effects: Vec<ActionEffect>,
}

/// Registry of user actions, indexed by [`ActionId`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActionRegistry {
    actions: Vec<UserActionDefinition>,
}

impl UserActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: UserActionDefinition) -> ActionId {
        let id = ActionId(self.actions.len() as u32);
        self.actions.push(definition);
        id
    }

    pub fn get(&self, id: ActionId) -> Option<&UserActionDefinition> {
        self.actions.get(id.0 as usize)
    }

    /// Actions attemptable by `player`, in registration order.
    pub fn for_player(
        &self,
        player: PlayerId,
    ) -> impl Iterator<Item = (ActionId, &UserActionDefinition)> {
        self.actions
            .iter()
            .enumerate()
            .filter(move |(_, definition)| definition.owner == player)
            .map(|(index, definition)| (ActionId(index as u32), definition))
    }
}
