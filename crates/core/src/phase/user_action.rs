//! The user-action phase: attempt-limited diplomatic/political actions.
//!
//! An attempt charges its cost, consumes one of the round's attempts, rolls
//! for success through the bridge, asks the accepting players, and only
//! then applies the action's effects. The remaining-attempt counters are
//! the delegate's persisted snapshot, independent of the state store.

use std::collections::BTreeMap;

use crate::bridge::{DelegateBridge, SoundClip};
use crate::change::Change;
use crate::dice::DiceKind;
use crate::error::{EngineError, Rejection, Ruling};
use crate::ids::{ActionId, PlayerId};
use crate::phase::{DelegateSnapshot, Endable, RequiresInput, Startable};
use crate::state::{ActionEffect, GameState, UserActionDefinition};
use crate::text;

/// Delegate for the user-action phase.
#[derive(Clone, Debug, Default)]
pub struct UserActionDelegate {
    player: Option<PlayerId>,
    attempts_used: BTreeMap<ActionId, u32>,
}

impl UserActionDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DelegateSnapshot {
        DelegateSnapshot::UserAction {
            attempts_used: self.attempts_used.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: DelegateSnapshot) -> Result<(), EngineError> {
        match snapshot {
            DelegateSnapshot::UserAction { attempts_used } => {
                self.attempts_used = attempts_used;
                Ok(())
            }
            DelegateSnapshot::Empty => {
                self.attempts_used.clear();
                Ok(())
            }
        }
    }

    fn attempts_remaining(&self, action: ActionId, definition: &UserActionDefinition) -> u32 {
        definition
            .attempts_per_round
            .saturating_sub(self.attempts_used.get(&action).copied().unwrap_or(0))
    }

    /// Actions the given player can still attempt this round.
    pub fn valid_actions(&self, state: &GameState, player: PlayerId) -> Vec<ActionId> {
        state
            .data
            .user_actions
            .for_player(player)
            .filter(|(action, definition)| self.attempts_remaining(*action, definition) > 0)
            .map(|(action, _)| action)
            .collect()
    }

    /// Attempts an action for the phase's acting player.
    pub fn attempt(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        action: ActionId,
    ) -> Result<Ruling, EngineError> {
        let player = bridge.player();
        let (definition, player_name) = {
            let state = bridge.game().read();
            let Some(definition) = state.data.user_actions.get(action) else {
                return Ok(Rejection::UnknownAction.into());
            };
            if definition.owner != player {
                return Ok(Rejection::UnknownAction.into());
            }
            if self.attempts_remaining(action, definition) == 0 {
                return Ok(Rejection::NoAttemptsRemaining.into());
            }
            let available = state.player(player)?.resource(definition.cost_resource);
            if available < definition.cost {
                let rejection = Rejection::NotEnoughResources {
                    needed: definition.cost,
                    available,
                };
                let message = rejection.to_string();
                drop(state);
                // Not a history entry; just tell the player why.
                let _ = bridge.remote_self().report(&message);
                return Ok(rejection.into());
            }
            (definition.clone(), text::player_name(&state, player))
        };

        *self.attempts_used.entry(action).or_default() += 1;

        if definition.cost > 0 {
            bridge.history().start_event(format!(
                "{player_name} spends {} on action: {}",
                definition.cost, definition.name
            ));
            bridge.add_change(Change::ResourceDelta {
                player,
                resource: definition.cost_resource,
                delta: -(definition.cost as i64),
            })?;
        } else {
            bridge
                .history()
                .start_event(format!("{player_name} takes action: {}", definition.name));
        }

        let succeeded = self.roll_succeeds(bridge, player, &definition)?;
        let accepted = succeeded && self.action_is_accepted(bridge, player, &definition)?;

        if accepted {
            let group = {
                let state = bridge.game().read();
                let members = definition
                    .effects
                    .iter()
                    .map(|effect| match effect {
                        ActionEffect::SetRelationship { a, b, new_type } => {
                            Change::set_relationship(&state, *a, *b, *new_type)
                        }
                        ActionEffect::GrantResource {
                            player,
                            resource,
                            amount,
                        } => Change::ResourceDelta {
                            player: *player,
                            resource: *resource,
                            delta: *amount as i64,
                        },
                    })
                    .collect::<Vec<_>>();
                Change::Group(members)
            };
            bridge.add_change(group)?;
            self.notify_outcome(bridge, player, &definition, true)?;
        } else {
            bridge
                .history()
                .add_child(format!("{player_name} fails on action: {}", definition.name), vec![]);
            self.notify_outcome(bridge, player, &definition, false)?;
        }
        Ok(Ruling::Applied)
    }

    /// Rolls the action's chance die. A target at or above the die size
    /// skips the roll and succeeds; a zero target always fails.
    fn roll_succeeds(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        definition: &UserActionDefinition,
    ) -> Result<bool, EngineError> {
        let hit = definition.chance_to_hit;
        let sides = definition.chance_dice_sides;
        if sides == 0 || hit >= sides {
            return Ok(true);
        }
        if hit == 0 {
            return Ok(false);
        }
        let rolls = bridge.random(
            sides,
            1,
            player,
            DiceKind::NonCombat,
            &format!("Attempting action: {}", definition.name),
        )?;
        let result = rolls[0] + 1;
        let success = result <= hit;
        let message = format!(
            "{}: rolling ({hit} out of {sides}) result: {result} = {}",
            definition.name,
            if success { "Success!" } else { "Failure!" }
        );
        bridge.history().add_child(message.clone(), vec![]);
        let _ = bridge.remote(player).report(&message);
        Ok(success)
    }

    /// Asks every accepting player; any veto fails the action.
    fn action_is_accepted(
        &self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        definition: &UserActionDefinition,
    ) -> Result<bool, EngineError> {
        let question = format!("Do you accept the action '{}'?", definition.name);
        for &acceptor in &definition.accept_by {
            let answer = bridge
                .remote(acceptor)
                .accept_action(player, &question)
                .map_err(|_| EngineError::Disconnected { player: acceptor })?;
            if !answer {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn notify_outcome(
        &self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        definition: &UserActionDefinition,
        succeeded: bool,
    ) -> Result<(), EngineError> {
        let clip = if succeeded {
            SoundClip::ActionSucceeded
        } else {
            SoundClip::ActionFailed
        };
        bridge.sound().play_for_all(clip, player);

        let message = format!(
            "Action '{}' {}",
            definition.name,
            if succeeded { "succeeded" } else { "failed" }
        );
        let others: Vec<PlayerId> = {
            let state = bridge.game().read();
            state
                .players
                .keys()
                .copied()
                .filter(|&other| other != player)
                .collect()
        };
        let _ = bridge.remote(player).report(&message);
        bridge.display().report_message(&others, &message);
        Ok(())
    }
}

impl Startable for UserActionDelegate {
    fn start(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        self.player = Some(bridge.player());
        Ok(())
    }
}

impl Endable for UserActionDelegate {
    /// Resets the attempt counters so the player can try again next round.
    fn end(&mut self, _bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        self.attempts_used.clear();
        Ok(())
    }
}

impl RequiresInput for UserActionDelegate {
    fn requires_user_input(&self, state: &GameState) -> bool {
        self.player
            .is_some_and(|player| !self.valid_actions(state, player).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{PlayerChoice, Scripted};
    use crate::state::fixtures::{self, FrontFixture};
    use crate::testkit::Harness;

    /// Registers a peace overture: costs 2, succeeds on a roll of 3 or
    /// less on a d6, needs the defender's consent, and ends the war.
    fn with_peace_overture(mut fixture: FrontFixture) -> (FrontFixture, ActionId) {
        let action = fixture.state.data.user_actions.register(UserActionDefinition {
            name: "peace overture".into(),
            owner: fixture.attacker,
            cost: 2,
            cost_resource: fixture.resource,
            chance_to_hit: 3,
            chance_dice_sides: 6,
            attempts_per_round: 1,
            accept_by: vec![fixture.defender],
            effects: vec![ActionEffect::SetRelationship {
                a: fixture.attacker,
                b: fixture.defender,
                new_type: fixture.peace,
            }],
        });
        (fixture, action)
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let fixture = fixtures::two_player_front();
        let mut harness = Harness::new(fixture.state.clone());
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = UserActionDelegate::new()
            .attempt(&mut bridge, ActionId(99))
            .unwrap();
        assert_eq!(ruling.rejection(), Some(&Rejection::UnknownAction));
        assert!(harness.journal.is_empty());
    }

    #[test]
    fn successful_attempt_charges_rolls_and_applies_effects() {
        let (fixture, action) = with_peace_overture(fixtures::two_player_front());
        let mut harness = Harness::new(fixture.state.clone());
        harness.script_dice([2]); // result 3 <= 3: success
        harness.register_player(
            fixture.defender,
            Box::new(Scripted::new([PlayerChoice::Accept(true)])),
        );

        let mut delegate = UserActionDelegate::new();
        let mut bridge = harness.bridge(fixture.attacker);
        delegate.start(&mut bridge).unwrap();
        let ruling = delegate.attempt(&mut bridge, action).unwrap();
        assert!(ruling.is_applied());

        let state = harness.lock.read();
        assert_eq!(
            state.player(fixture.attacker).unwrap().resource(fixture.resource),
            18
        );
        assert_eq!(
            state.relationship(fixture.attacker, fixture.defender),
            fixture.peace
        );
        assert!(!state.at_war(fixture.attacker, fixture.defender));
        // The round's only attempt is spent.
        assert!(delegate.valid_actions(&state, fixture.attacker).is_empty());
        assert!(!delegate.requires_user_input(&state));
        drop(state);
        assert!(
            harness
                .history
                .events()
                .iter()
                .any(|event| event.description.contains("rolling (3 out of 6)"))
        );
    }

    #[test]
    fn failed_roll_still_consumes_the_charge_and_attempt() {
        let (fixture, action) = with_peace_overture(fixtures::two_player_front());
        let mut harness = Harness::new(fixture.state.clone());
        harness.script_dice([5]); // result 6 > 3: failure
        harness.register_player(fixture.defender, Box::new(Scripted::new([])));

        let mut delegate = UserActionDelegate::new();
        let mut bridge = harness.bridge(fixture.attacker);
        delegate.start(&mut bridge).unwrap();
        let ruling = delegate.attempt(&mut bridge, action).unwrap();
        assert!(ruling.is_applied());

        let state = harness.lock.read();
        assert_eq!(
            state.player(fixture.attacker).unwrap().resource(fixture.resource),
            18
        );
        // Still at war: the effects never applied.
        assert!(state.at_war(fixture.attacker, fixture.defender));
        assert!(delegate.valid_actions(&state, fixture.attacker).is_empty());
    }

    #[test]
    fn any_veto_fails_the_action_after_the_roll() {
        let (fixture, action) = with_peace_overture(fixtures::two_player_front());
        let mut harness = Harness::new(fixture.state.clone());
        harness.script_dice([0]);
        harness.register_player(
            fixture.defender,
            Box::new(Scripted::new([PlayerChoice::Accept(false)])),
        );

        let mut delegate = UserActionDelegate::new();
        let mut bridge = harness.bridge(fixture.attacker);
        delegate.start(&mut bridge).unwrap();
        delegate.attempt(&mut bridge, action).unwrap();

        let state = harness.lock.read();
        assert!(state.at_war(fixture.attacker, fixture.defender));
        assert!(
            harness
                .history
                .events()
                .iter()
                .any(|event| event.description.contains("fails on action"))
        );
    }

    #[test]
    fn unaffordable_actions_reject_without_consuming_an_attempt() {
        let (fixture, action) = with_peace_overture(fixtures::two_player_front());
        // Drain the attacker's balance below the cost.
        let mut state = fixture.state.clone();
        let balance = state.player(fixture.attacker).unwrap().resource(fixture.resource);
        crate::change::Change::ResourceDelta {
            player: fixture.attacker,
            resource: fixture.resource,
            delta: -(balance as i64) + 1,
        }
        .perform(&mut state)
        .unwrap();

        let mut harness = Harness::new(state);
        let mut delegate = UserActionDelegate::new();
        let mut bridge = harness.bridge(fixture.attacker);
        delegate.start(&mut bridge).unwrap();
        let ruling = delegate.attempt(&mut bridge, action).unwrap();
        assert!(matches!(
            ruling.rejection(),
            Some(Rejection::NotEnoughResources { .. })
        ));
        assert!(harness.journal.is_empty());
        assert!(harness.history.is_empty());
        let state = harness.lock.read();
        assert!(!delegate.valid_actions(&state, fixture.attacker).is_empty());
    }

    #[test]
    fn ending_the_phase_resets_attempts() {
        let (fixture, action) = with_peace_overture(fixtures::two_player_front());
        let mut harness = Harness::new(fixture.state.clone());
        harness.script_dice([5]);
        harness.register_player(fixture.defender, Box::new(Scripted::new([])));

        let mut delegate = UserActionDelegate::new();
        let mut bridge = harness.bridge(fixture.attacker);
        delegate.start(&mut bridge).unwrap();
        delegate.attempt(&mut bridge, action).unwrap();
        delegate.end(&mut bridge).unwrap();

        let state = harness.lock.read();
        assert_eq!(delegate.valid_actions(&state, fixture.attacker), vec![action]);
    }

    #[test]
    fn snapshot_round_trips_attempt_counters() {
        let (fixture, action) = with_peace_overture(fixtures::two_player_front());
        let mut delegate = UserActionDelegate::new();
        delegate.attempts_used.insert(action, 1);

        let snapshot = delegate.snapshot();
        let mut restored = UserActionDelegate::new();
        restored.restore(snapshot).unwrap();
        assert_eq!(
            restored.valid_actions(&fixture.state, fixture.attacker),
            Vec::<ActionId>::new()
        );
    }
}
