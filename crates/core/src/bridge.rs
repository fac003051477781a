//! The capability bridge between delegates and the host session.
//!
//! A delegate never constructs its own bridge; the session supplies one per
//! executing phase. Everything a rule needs to touch the outside world goes
//! through here: applying changes, drawing synchronized dice, writing
//! history, querying remote players, and broadcasting presentation side
//! effects.

use std::collections::VecDeque;
use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::change::{Change, ChangeJournal};
use crate::dice::{DiceKind, RandomSource};
use crate::error::{Disconnected, EngineError};
use crate::history::HistoryWriter;
use crate::ids::{PlayerId, TerritoryId, UnitId};
use crate::state::StateLock;

/// Presentation sound effects, keyed for the session's sound channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SoundClip {
    BombardmentHit,
    ActionSucceeded,
    ActionFailed,
}

/// Capability interface handed to an executing delegate.
pub trait DelegateBridge {
    /// Read access to the authoritative state. Guards must be dropped
    /// before any blocking bridge call.
    fn game(&self) -> &StateLock;

    /// The player the current phase is executing for.
    fn player(&self) -> PlayerId;

    /// Applies a change, attributed to the current delegate and player.
    fn add_change(&mut self, change: Change) -> Result<(), EngineError>;

    /// Draws `count` zero-based rolls in `[0, sides)` from the single
    /// permitted randomness source. In a networked session every
    /// participant observes the identical sequence for the identical call.
    fn random(
        &mut self,
        sides: u32,
        count: usize,
        player: PlayerId,
        kind: DiceKind,
        annotation: &str,
    ) -> Result<Vec<u32>, EngineError>;

    /// The append-only history writer.
    fn history(&mut self) -> &mut dyn HistoryWriter;

    /// Synchronous proxy to a player's decision making. Calls may block on
    /// human input or a network round trip.
    fn remote(&self, player: PlayerId) -> &dyn RemotePlayer;

    /// The acting player's own proxy.
    fn remote_self(&self) -> &dyn RemotePlayer {
        self.remote(self.player())
    }

    /// Fire-and-forget sound broadcast; failures never affect outcomes.
    fn sound(&self) -> &dyn SoundBroadcaster;

    /// Fire-and-forget display broadcast; failures never affect outcomes.
    fn display(&self) -> &dyn DisplayBroadcaster;
}

/// Synchronous decision proxy for one player (human UI or AI).
///
/// Every method may block until the player answers. [`Disconnected`] means
/// the player is unreachable or the session was torn down mid-wait; the
/// caller converts it into the fatal [`EngineError::Disconnected`].
pub trait RemotePlayer: Send + Sync {
    /// "Where should the bombardment strike?" — `None` (no attack) is
    /// always a legal answer.
    fn choose_bombardment_target(
        &self,
        candidates: &[TerritoryId],
        from: Option<TerritoryId>,
    ) -> Result<Option<TerritoryId>, Disconnected>;

    /// "Which unit should be hit?" when damage goes to units.
    fn choose_unit_target(
        &self,
        territory: TerritoryId,
        candidates: &[UnitId],
    ) -> Result<Option<UnitId>, Disconnected>;

    /// "Do you accept this proposed action?"
    fn accept_action(&self, proposer: PlayerId, question: &str) -> Result<bool, Disconnected>;

    /// Deliver a message to the player.
    fn report(&self, message: &str) -> Result<(), Disconnected>;
}

/// Sound broadcast endpoint.
pub trait SoundBroadcaster: Send + Sync {
    fn play_for_all(&self, clip: SoundClip, initiator: PlayerId);
    fn play_for(&self, clip: SoundClip, recipients: &[PlayerId]);
}

/// Display/message broadcast endpoint.
pub trait DisplayBroadcaster: Send + Sync {
    fn report_message(&self, recipients: &[PlayerId], message: &str);
}

/// Broadcaster that drops everything. Default for headless sessions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBroadcaster;

impl SoundBroadcaster for NullBroadcaster {
    fn play_for_all(&self, _clip: SoundClip, _initiator: PlayerId) {}
    fn play_for(&self, _clip: SoundClip, _recipients: &[PlayerId]) {}
}

impl DisplayBroadcaster for NullBroadcaster {
    fn report_message(&self, _recipients: &[PlayerId], _message: &str) {}
}

/// Remote proxy for a player with no registered endpoint: every query is a
/// disconnect.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unreachable;

impl RemotePlayer for Unreachable {
    fn choose_bombardment_target(
        &self,
        _candidates: &[TerritoryId],
        _from: Option<TerritoryId>,
    ) -> Result<Option<TerritoryId>, Disconnected> {
        Err(Disconnected)
    }

    fn choose_unit_target(
        &self,
        _territory: TerritoryId,
        _candidates: &[UnitId],
    ) -> Result<Option<UnitId>, Disconnected> {
        Err(Disconnected)
    }

    fn accept_action(&self, _proposer: PlayerId, _question: &str) -> Result<bool, Disconnected> {
        Err(Disconnected)
    }

    fn report(&self, _message: &str) -> Result<(), Disconnected> {
        Err(Disconnected)
    }
}

/// Passive stand-in: declines every attack, accepts every proposal,
/// swallows reports. Useful as an AI fallback and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passive;

impl RemotePlayer for Passive {
    fn choose_bombardment_target(
        &self,
        _candidates: &[TerritoryId],
        _from: Option<TerritoryId>,
    ) -> Result<Option<TerritoryId>, Disconnected> {
        Ok(None)
    }

    fn choose_unit_target(
        &self,
        _territory: TerritoryId,
        candidates: &[UnitId],
    ) -> Result<Option<UnitId>, Disconnected> {
        Ok(candidates.first().copied())
    }

    fn accept_action(&self, _proposer: PlayerId, _question: &str) -> Result<bool, Disconnected> {
        Ok(true)
    }

    fn report(&self, _message: &str) -> Result<(), Disconnected> {
        Ok(())
    }
}

/// One scripted answer for [`Scripted`].
#[derive(Clone, Debug)]
pub enum PlayerChoice {
    BombardmentTarget(Option<TerritoryId>),
    UnitTarget(Option<UnitId>),
    Accept(bool),
}

/// Replays a fixed script of answers; an exhausted or mismatched script
/// reads as a disconnect so tests fail loudly instead of hanging.
#[derive(Debug, Default)]
pub struct Scripted {
    choices: Mutex<VecDeque<PlayerChoice>>,
}

impl Scripted {
    pub fn new(choices: impl IntoIterator<Item = PlayerChoice>) -> Self {
        Self {
            choices: Mutex::new(choices.into_iter().collect()),
        }
    }

    fn next(&self) -> Result<PlayerChoice, Disconnected> {
        self.choices
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .ok_or(Disconnected)
    }
}

impl RemotePlayer for Scripted {
    fn choose_bombardment_target(
        &self,
        candidates: &[TerritoryId],
        _from: Option<TerritoryId>,
    ) -> Result<Option<TerritoryId>, Disconnected> {
        match self.next()? {
            PlayerChoice::BombardmentTarget(Some(choice)) if !candidates.contains(&choice) => {
                Err(Disconnected)
            }
            PlayerChoice::BombardmentTarget(choice) => Ok(choice),
            _ => Err(Disconnected),
        }
    }

    fn choose_unit_target(
        &self,
        _territory: TerritoryId,
        candidates: &[UnitId],
    ) -> Result<Option<UnitId>, Disconnected> {
        match self.next()? {
            PlayerChoice::UnitTarget(Some(choice)) if !candidates.contains(&choice) => {
                Err(Disconnected)
            }
            PlayerChoice::UnitTarget(choice) => Ok(choice),
            _ => Err(Disconnected),
        }
    }

    fn accept_action(&self, _proposer: PlayerId, _question: &str) -> Result<bool, Disconnected> {
        match self.next()? {
            PlayerChoice::Accept(answer) => Ok(answer),
            _ => Err(Disconnected),
        }
    }

    fn report(&self, _message: &str) -> Result<(), Disconnected> {
        Ok(())
    }
}

/// Registry of remote proxies per player.
#[derive(Default)]
pub struct PlayerDirectory {
    players: FxHashMap<PlayerId, Box<dyn RemotePlayer>>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, player: PlayerId, remote: Box<dyn RemotePlayer>) {
        self.players.insert(player, remote);
    }

    /// The proxy for `player`; unregistered players resolve to
    /// [`Unreachable`].
    pub fn get(&self, player: PlayerId) -> &dyn RemotePlayer {
        static UNREACHABLE: Unreachable = Unreachable;
        self.players
            .get(&player)
            .map(Box::as_ref)
            .unwrap_or(&UNREACHABLE)
    }
}

/// The canonical bridge wiring used by the host session.
///
/// Owns nothing: it borrows the session's lock, journal, history, dice, and
/// endpoints for the duration of one phase execution.
pub struct EngineBridge<'a> {
    lock: &'a StateLock,
    journal: &'a mut ChangeJournal,
    history: &'a mut dyn HistoryWriter,
    dice: &'a mut dyn RandomSource,
    players: &'a PlayerDirectory,
    sound: &'a dyn SoundBroadcaster,
    display: &'a dyn DisplayBroadcaster,
    player: PlayerId,
}

impl<'a> EngineBridge<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lock: &'a StateLock,
        journal: &'a mut ChangeJournal,
        history: &'a mut dyn HistoryWriter,
        dice: &'a mut dyn RandomSource,
        players: &'a PlayerDirectory,
        sound: &'a dyn SoundBroadcaster,
        display: &'a dyn DisplayBroadcaster,
        player: PlayerId,
    ) -> Self {
        Self {
            lock,
            journal,
            history,
            dice,
            players,
            sound,
            display,
            player,
        }
    }
}

impl DelegateBridge for EngineBridge<'_> {
    fn game(&self) -> &StateLock {
        self.lock
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn add_change(&mut self, change: Change) -> Result<(), EngineError> {
        tracing::debug!(player = %self.player, "applying change");
        let mut state = self.lock.write();
        self.journal.apply(&mut state, change)
    }

    fn random(
        &mut self,
        sides: u32,
        count: usize,
        player: PlayerId,
        kind: DiceKind,
        annotation: &str,
    ) -> Result<Vec<u32>, EngineError> {
        self.dice.roll(sides, count, player, kind, annotation)
    }

    fn history(&mut self) -> &mut dyn HistoryWriter {
        &mut *self.history
    }

    fn remote(&self, player: PlayerId) -> &dyn RemotePlayer {
        self.players.get(player)
    }

    fn sound(&self) -> &dyn SoundBroadcaster {
        self.sound
    }

    fn display(&self) -> &dyn DisplayBroadcaster {
        self.display
    }
}
