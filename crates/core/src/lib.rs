//! Deterministic rule engine for a turn-based strategy simulation.
//!
//! `frontline-core` defines the authoritative state store, the invertible
//! change journal that is the only legal way to mutate it, the capability
//! bridge delegates execute through, the phase delegates themselves, and
//! the bombardment resolution algorithm. Everything here is synchronous
//! and deterministic: identical inputs (state, dice sequence, player
//! choices) produce identical changes, which is what replay, undo, and
//! cross-peer fairness rest on. The host session lives in
//! `frontline-session`.

pub mod bridge;
pub mod change;
pub mod combat;
pub mod config;
pub mod dice;
pub mod error;
pub mod history;
pub mod ids;
pub mod phase;
pub mod state;
pub mod text;

pub use bridge::{
    DelegateBridge, DisplayBroadcaster, EngineBridge, PlayerDirectory, RemotePlayer,
    SoundBroadcaster, SoundClip,
};
pub use change::{Change, ChangeJournal};
pub use combat::BombardmentDelegate;
pub use config::RuleVariants;
pub use dice::{DiceKind, PcgDice, RandomSource, ScriptedDice};
pub use error::{Disconnected, EngineError, Rejection, Ruling};
pub use history::{EventId, HistoryEvent, HistoryLog, HistoryWriter};
pub use ids::{
    ActionId, EntityRef, PlayerId, RelationshipTypeId, ResourceId, TechId, TerritoryId, UnitId,
    UnitTypeId,
};
pub use phase::{
    DelegateSnapshot, EditDelegate, Endable, PhaseDelegate, PhaseMachine, PhaseState, PhaseTable,
    RequiresInput, Startable, UserActionDelegate,
};
pub use state::{GameData, GameState, StateLock};

#[cfg(test)]
pub(crate) mod testkit {
    //! Shared wiring for delegate tests: a session-in-miniature that hands
    //! out bridges over a fixture state.

    use crate::bridge::{EngineBridge, NullBroadcaster, PlayerDirectory, RemotePlayer};
    use crate::change::ChangeJournal;
    use crate::dice::{RandomSource, ScriptedDice};
    use crate::history::HistoryLog;
    use crate::ids::PlayerId;
    use crate::state::{GameState, StateLock};

    pub struct Harness {
        pub lock: StateLock,
        pub journal: ChangeJournal,
        pub history: HistoryLog,
        pub dice: Box<dyn RandomSource>,
        pub players: PlayerDirectory,
        sound: NullBroadcaster,
        display: NullBroadcaster,
    }

    impl Harness {
        pub fn new(state: GameState) -> Self {
            Self {
                lock: StateLock::new(state),
                journal: ChangeJournal::new(),
                history: HistoryLog::new(),
                dice: Box::new(ScriptedDice::default()),
                players: PlayerDirectory::new(),
                sound: NullBroadcaster,
                display: NullBroadcaster,
            }
        }

        pub fn script_dice(&mut self, rolls: impl IntoIterator<Item = u32>) {
            self.dice = Box::new(ScriptedDice::new(rolls));
        }

        pub fn register_player(&mut self, player: PlayerId, remote: Box<dyn RemotePlayer>) {
            self.players.register(player, remote);
        }

        pub fn bridge(&mut self, player: PlayerId) -> EngineBridge<'_> {
            EngineBridge::new(
                &self.lock,
                &mut self.journal,
                &mut self.history,
                self.dice.as_mut(),
                &self.players,
                &self.sound,
                &self.display,
                player,
            )
        }
    }
}
