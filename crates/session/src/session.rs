//! The host session: owns the authoritative state and everything the
//! bridge wires together.
//!
//! Exactly one `GameSession` mutates a given game. Phase delegates execute
//! synchronously through [`frontline_core::EngineBridge`]; presentation
//! readers take short read guards on [`GameSession::state`] or subscribe to
//! the event bus.

use std::collections::BTreeMap;
use std::sync::Arc;

use frontline_core::bridge::{DelegateBridge, EngineBridge, PlayerDirectory, RemotePlayer};
use frontline_core::change::ChangeJournal;
use frontline_core::dice::{PcgDice, RandomSource};
use frontline_core::error::{EngineError, Ruling};
use frontline_core::history::{HistoryEvent, HistoryLog};
use frontline_core::ids::{
    ActionId, PlayerId, RelationshipTypeId, ResourceId, TechId, TerritoryId, UnitId, UnitTypeId,
};
use frontline_core::phase::{
    DelegateSnapshot, EditDelegate, PhaseDelegate, PhaseMachine, PhaseState, PhaseTable,
};
use frontline_core::state::{GameState, StateLock};

use crate::error::{Result, SessionError};
use crate::events::{EventBus, SessionEvent, Topic};
use crate::players::{ChannelPlayer, PlayerAgent};
use crate::relay::{BusBroadcaster, RelayedDice};
use crate::snapshot::{CatchUpPacket, SessionSnapshot};

/// Host configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Seed for the authoritative dice stream. `None` draws one from OS
    /// entropy — rule logic itself never touches any source but the bridge.
    pub seed: Option<u64>,
    /// Capacity of each event-bus topic.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            event_capacity: 128,
        }
    }
}

/// The authoritative game host.
pub struct GameSession {
    lock: Arc<StateLock>,
    initial: GameState,
    journal: ChangeJournal,
    history: HistoryLog,
    dice: Box<dyn RandomSource>,
    players: PlayerDirectory,
    bus: Arc<EventBus>,
    broadcaster: BusBroadcaster,
    table: PhaseTable,
    current: Option<(PlayerId, PhaseMachine)>,
    ended_snapshots: BTreeMap<String, DelegateSnapshot>,
}

impl GameSession {
    pub fn new(state: GameState, config: SessionConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        tracing::info!(seed, "session starting");
        let bus = Arc::new(EventBus::with_capacity(config.event_capacity));
        let dice = Box::new(RelayedDice::new(
            Box::new(PcgDice::seeded(seed)),
            bus.clone(),
        ));
        Self {
            lock: Arc::new(StateLock::new(state.clone())),
            initial: state,
            journal: ChangeJournal::new(),
            history: HistoryLog::new(),
            dice,
            players: PlayerDirectory::new(),
            bus: bus.clone(),
            broadcaster: BusBroadcaster::new(bus),
            table: PhaseTable::standard(),
            current: None,
            ended_snapshots: BTreeMap::new(),
        }
    }

    // --- wiring -------------------------------------------------------

    /// Read access for presentation threads. Guards must be short-lived.
    pub fn state(&self) -> Arc<StateLock> {
        self.lock.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.bus.subscribe(topic)
    }

    pub(crate) fn bus_handle(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    pub fn register_player(&mut self, player: PlayerId, remote: Box<dyn RemotePlayer>) {
        self.players.register(player, remote);
    }

    /// Seats an async agent (frontend or AI) behind a channel proxy.
    /// Must be called from within a tokio runtime; the servicing task is
    /// spawned immediately.
    pub fn register_agent(&mut self, player: PlayerId, agent: impl PlayerAgent) {
        self.players
            .register(player, Box::new(ChannelPlayer::with_agent(agent)));
    }

    /// History read: always a prefix of the final log.
    pub fn history(&self) -> &[HistoryEvent] {
        self.history.events()
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    // --- phase lifecycle ----------------------------------------------

    /// Starts the named phase for a player. Only one phase runs at a time.
    pub fn start_phase(&mut self, name: &str, player: PlayerId) -> Result<()> {
        if let Some((_, machine)) = &self.current
            && machine.state() != PhaseState::Ended
        {
            return Err(SessionError::WrongPhase {
                running: machine.name().to_string(),
                wanted: "no running phase",
            });
        }
        let mut machine = self
            .table
            .create(name)
            .ok_or_else(|| SessionError::UnknownPhase(name.to_string()))?;
        if let Some(snapshot) = self.ended_snapshots.remove(machine.name()) {
            machine.restore(snapshot)?;
        }
        {
            let mut bridge = bridge(
                &self.lock,
                &mut self.journal,
                &mut self.history,
                self.dice.as_mut(),
                &self.players,
                &self.broadcaster,
                player,
            );
            machine.start(&mut bridge)?;
        }
        machine.refresh_input_state(&self.lock.read());
        self.publish_phase(&machine, player);
        self.current = Some((player, machine));
        Ok(())
    }

    /// Ends the running phase and keeps its snapshot for save/restore.
    pub fn end_phase(&mut self) -> Result<DelegateSnapshot> {
        let (player, mut machine) = self.current.take().ok_or(SessionError::NoActivePhase)?;
        {
            let mut bridge = bridge(
                &self.lock,
                &mut self.journal,
                &mut self.history,
                self.dice.as_mut(),
                &self.players,
                &self.broadcaster,
                player,
            );
            machine.end(&mut bridge)?;
        }
        self.publish_phase(&machine, player);
        let snapshot = machine.snapshot();
        self.ended_snapshots
            .insert(machine.name().to_string(), snapshot.clone());
        self.current = Some((player, machine));
        Ok(snapshot)
    }

    pub fn phase_state(&self) -> Option<(String, PhaseState)> {
        self.current
            .as_ref()
            .map(|(_, machine)| (machine.name().to_string(), machine.state()))
    }

    fn publish_phase(&self, machine: &PhaseMachine, player: PlayerId) {
        self.bus.publish(SessionEvent::Phase {
            name: machine.name().to_string(),
            state: machine.state().to_string(),
            player,
        });
    }

    fn with_phase<R>(
        &mut self,
        f: impl FnOnce(&mut PhaseDelegate, &mut dyn DelegateBridge) -> Result<R>,
    ) -> Result<R> {
        let (player, mut machine) = self.current.take().ok_or(SessionError::NoActivePhase)?;
        let result = {
            let mut bridge = bridge(
                &self.lock,
                &mut self.journal,
                &mut self.history,
                self.dice.as_mut(),
                &self.players,
                &self.broadcaster,
                player,
            );
            f(machine.delegate_mut(), &mut bridge)
        };
        machine.refresh_input_state(&self.lock.read());
        self.current = Some((player, machine));
        result
    }

    fn with_edit<R>(
        &mut self,
        f: impl FnOnce(&mut EditDelegate, &mut dyn DelegateBridge) -> std::result::Result<R, EngineError>,
    ) -> Result<R> {
        self.with_phase(|delegate, bridge| match delegate {
            PhaseDelegate::Edit(edit) => f(edit, bridge).map_err(SessionError::from),
            other => Err(wrong_phase(other, "edit")),
        })
    }

    // --- edit operations ----------------------------------------------

    pub fn set_edit_mode(&mut self, enabled: bool) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.set_edit_mode(bridge, enabled))
    }

    pub fn remove_units(&mut self, territory: TerritoryId, units: &[UnitId]) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.remove_units(bridge, territory, units))
    }

    pub fn add_units(
        &mut self,
        territory: TerritoryId,
        units: &[(UnitTypeId, PlayerId)],
    ) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.add_units(bridge, territory, units))
    }

    pub fn change_territory_owner(
        &mut self,
        territory: TerritoryId,
        new_owner: PlayerId,
    ) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.change_territory_owner(bridge, territory, new_owner))
    }

    pub fn set_resource_total(
        &mut self,
        player: PlayerId,
        resource: ResourceId,
        new_total: i64,
    ) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.set_resource_total(bridge, player, resource, new_total))
    }

    pub fn add_techs(&mut self, player: PlayerId, techs: &[TechId]) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.add_techs(bridge, player, techs))
    }

    pub fn remove_techs(&mut self, player: PlayerId, techs: &[TechId]) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.remove_techs(bridge, player, techs))
    }

    pub fn change_unit_hit_damage(
        &mut self,
        territory: TerritoryId,
        damages: &[(UnitId, u32)],
    ) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.change_unit_hit_damage(bridge, territory, damages))
    }

    pub fn change_unit_bombing_damage(
        &mut self,
        territory: TerritoryId,
        damages: &[(UnitId, u32)],
    ) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.change_unit_bombing_damage(bridge, territory, damages))
    }

    pub fn change_relationships(
        &mut self,
        changes: &[(PlayerId, PlayerId, RelationshipTypeId)],
    ) -> Result<Ruling> {
        self.with_edit(|edit, bridge| edit.change_relationships(bridge, changes))
    }

    // --- user actions -------------------------------------------------

    pub fn valid_user_actions(&self) -> Result<Vec<ActionId>> {
        let (player, machine) = self.current.as_ref().ok_or(SessionError::NoActivePhase)?;
        match machine.delegate() {
            PhaseDelegate::UserAction(delegate) => {
                Ok(delegate.valid_actions(&self.lock.read(), *player))
            }
            other => Err(wrong_phase(other, "user_action")),
        }
    }

    pub fn attempt_user_action(&mut self, action: ActionId) -> Result<Ruling> {
        self.with_phase(|delegate, bridge| match delegate {
            PhaseDelegate::UserAction(user_action) => user_action
                .attempt(bridge, action)
                .map_err(SessionError::from),
            other => Err(wrong_phase(other, "user_action")),
        })
    }

    // --- bombardment --------------------------------------------------

    pub fn fire_bombardment(&mut self) -> Result<()> {
        self.with_phase(|delegate, bridge| match delegate {
            PhaseDelegate::Bombardment(bombardment) => {
                bombardment.run(bridge).map_err(SessionError::from)
            }
            other => Err(wrong_phase(other, "bombardment")),
        })
    }

    // --- journal ------------------------------------------------------

    /// Undoes the most recent logical action by applying its inverse. The
    /// journal is never truncated.
    pub fn undo_last(&mut self) -> Result<bool> {
        Ok(self.journal.undo_last_locked(&self.lock)?)
    }

    /// Replays the journal from the initial state and compares with the
    /// live state. Divergence would mean a non-deterministic change.
    pub fn verify_replay(&self) -> Result<bool> {
        let replayed = ChangeJournal::replay(&self.initial, self.journal.applied())?;
        Ok(replayed == *self.lock.read())
    }

    /// Everything a late-joining peer needs to reconstruct the state.
    pub fn catch_up_packet(&self) -> CatchUpPacket {
        CatchUpPacket {
            initial: self.initial.clone(),
            changes: self.journal.applied().to_vec(),
        }
    }

    /// A save point: live state plus the per-delegate snapshots.
    pub fn save_snapshot(&self) -> SessionSnapshot {
        let mut delegates = self.ended_snapshots.clone();
        if let Some((_, machine)) = &self.current {
            delegates.insert(machine.name().to_string(), machine.snapshot());
        }
        SessionSnapshot {
            state: self.lock.read().clone(),
            delegates,
        }
    }
}

fn wrong_phase(delegate: &PhaseDelegate, wanted: &'static str) -> SessionError {
    let running = match delegate {
        PhaseDelegate::Edit(_) => "edit",
        PhaseDelegate::UserAction(_) => "user_action",
        PhaseDelegate::Bombardment(_) => "bombardment",
    };
    SessionError::WrongPhase {
        running: running.to_string(),
        wanted,
    }
}

#[allow(clippy::too_many_arguments)]
fn bridge<'a>(
    lock: &'a Arc<StateLock>,
    journal: &'a mut ChangeJournal,
    history: &'a mut HistoryLog,
    dice: &'a mut dyn RandomSource,
    players: &'a PlayerDirectory,
    broadcaster: &'a BusBroadcaster,
    player: PlayerId,
) -> EngineBridge<'a> {
    EngineBridge::new(
        lock,
        journal,
        history,
        dice,
        players,
        broadcaster,
        broadcaster,
        player,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontline_core::state::fixtures;

    fn session() -> (GameSession, fixtures::FrontFixture) {
        let fixture = fixtures::two_player_front();
        let session = GameSession::new(
            fixture.state.clone(),
            SessionConfig {
                seed: Some(1),
                ..SessionConfig::default()
            },
        );
        (session, fixture)
    }

    #[test]
    fn unknown_phases_are_errors() {
        let (mut session, fixture) = session();
        let result = session.start_phase("production", fixture.attacker);
        assert!(matches!(result, Err(SessionError::UnknownPhase(_))));
    }

    #[test]
    fn operations_require_the_matching_phase() {
        let (mut session, fixture) = session();
        assert!(matches!(
            session.fire_bombardment(),
            Err(SessionError::NoActivePhase)
        ));
        session.start_phase("edit", fixture.attacker).unwrap();
        assert!(matches!(
            session.fire_bombardment(),
            Err(SessionError::WrongPhase { .. })
        ));
        // The edit phase itself still works afterwards.
        assert!(session.set_edit_mode(true).unwrap().is_applied());
    }

    #[test]
    fn only_one_phase_runs_at_a_time() {
        let (mut session, fixture) = session();
        session.start_phase("edit", fixture.attacker).unwrap();
        assert!(matches!(
            session.start_phase("bombardment", fixture.attacker),
            Err(SessionError::WrongPhase { .. })
        ));
        session.end_phase().unwrap();
        session
            .start_phase("bombardment", fixture.attacker)
            .unwrap();
    }

    #[test]
    fn replay_verification_holds_after_edits() {
        let (mut session, fixture) = session();
        session.start_phase("edit", fixture.attacker).unwrap();
        session.set_edit_mode(true).unwrap();
        session
            .set_resource_total(fixture.defender, fixture.resource, 42)
            .unwrap();
        session.end_phase().unwrap();
        assert!(session.verify_replay().unwrap());
    }
}
