//! Phase delegates and their lifecycle machine.
//!
//! Each phase of a game round is a delegate: an independent rule unit with
//! a start/run/end lifecycle. Delegates are plain values implementing the
//! small capability traits below and are selected by a dispatch table keyed
//! by phase name — there is no inheritance hierarchy.

pub mod edit;
pub mod user_action;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bridge::DelegateBridge;
use crate::combat::BombardmentDelegate;
use crate::error::EngineError;
use crate::ids::ActionId;
use crate::state::GameState;

pub use edit::EditDelegate;
pub use user_action::UserActionDelegate;

/// Lifecycle of a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PhaseState {
    NotStarted,
    Started,
    /// The phase is waiting for further player decisions before it can end.
    AwaitingInput,
    Ended,
}

/// A delegate that establishes preconditions when its phase begins.
pub trait Startable {
    fn start(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError>;
}

/// A delegate with cleanup when its phase ends (e.g. resetting per-round
/// counters).
pub trait Endable {
    fn end(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError>;
}

/// A delegate that may need repeated interactive steps before ending.
pub trait RequiresInput {
    fn requires_user_input(&self, state: &GameState) -> bool;
}

/// The delegate variants the engine ships.
#[derive(Clone, Debug)]
pub enum PhaseDelegate {
    Edit(EditDelegate),
    UserAction(UserActionDelegate),
    Bombardment(BombardmentDelegate),
}

impl Startable for PhaseDelegate {
    fn start(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        match self {
            PhaseDelegate::Edit(delegate) => delegate.start(bridge),
            PhaseDelegate::UserAction(delegate) => delegate.start(bridge),
            PhaseDelegate::Bombardment(delegate) => delegate.start(bridge),
        }
    }
}

impl Endable for PhaseDelegate {
    fn end(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        match self {
            PhaseDelegate::Edit(delegate) => delegate.end(bridge),
            PhaseDelegate::UserAction(delegate) => delegate.end(bridge),
            PhaseDelegate::Bombardment(delegate) => delegate.end(bridge),
        }
    }
}

impl RequiresInput for PhaseDelegate {
    fn requires_user_input(&self, state: &GameState) -> bool {
        match self {
            PhaseDelegate::Edit(delegate) => delegate.requires_user_input(state),
            PhaseDelegate::UserAction(delegate) => delegate.requires_user_input(state),
            PhaseDelegate::Bombardment(delegate) => delegate.requires_user_input(state),
        }
    }
}

/// Serializable per-delegate state, persisted alongside the state store.
///
/// Deliberately independent of [`GameState`]: it captures only what a
/// delegate needs across save/restore, such as remaining attempt counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegateSnapshot {
    Empty,
    UserAction {
        attempts_used: BTreeMap<ActionId, u32>,
    },
}

/// Enforces the `NotStarted → Started → (AwaitingInput)* → Ended`
/// lifecycle around a delegate. Lifecycle violations are engine errors, not
/// validation failures.
#[derive(Clone, Debug)]
pub struct PhaseMachine {
    name: String,
    state: PhaseState,
    delegate: PhaseDelegate,
}

impl PhaseMachine {
    pub fn new(name: impl Into<String>, delegate: PhaseDelegate) -> Self {
        Self {
            name: name.into(),
            state: PhaseState::NotStarted,
            delegate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn delegate(&self) -> &PhaseDelegate {
        &self.delegate
    }

    /// The delegate, for invoking its phase-specific operations. Callers
    /// must have started the phase first.
    pub fn delegate_mut(&mut self) -> &mut PhaseDelegate {
        &mut self.delegate
    }

    /// Begins the phase. Legal from `NotStarted` or `Ended` (phases run
    /// again each round).
    pub fn start(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        match self.state {
            PhaseState::NotStarted | PhaseState::Ended => {
                tracing::info!(phase = %self.name, "phase starting");
                self.delegate.start(bridge)?;
                self.state = PhaseState::Started;
                Ok(())
            }
            state => Err(self.order_error("start", state)),
        }
    }

    /// Ends the phase and runs delegate cleanup.
    pub fn end(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        match self.state {
            PhaseState::Started | PhaseState::AwaitingInput => {
                tracing::info!(phase = %self.name, "phase ending");
                self.delegate.end(bridge)?;
                self.state = PhaseState::Ended;
                Ok(())
            }
            state => Err(self.order_error("end", state)),
        }
    }

    /// Re-evaluates whether the phase is waiting on player input. The phase
    /// stays in `AwaitingInput` until no further valid actions exist.
    pub fn refresh_input_state(&mut self, state: &GameState) {
        if matches!(self.state, PhaseState::Started | PhaseState::AwaitingInput) {
            self.state = if self.delegate.requires_user_input(state) {
                PhaseState::AwaitingInput
            } else {
                PhaseState::Started
            };
        }
    }

    pub fn snapshot(&self) -> DelegateSnapshot {
        match &self.delegate {
            PhaseDelegate::UserAction(delegate) => delegate.snapshot(),
            PhaseDelegate::Edit(_) | PhaseDelegate::Bombardment(_) => DelegateSnapshot::Empty,
        }
    }

    pub fn restore(&mut self, snapshot: DelegateSnapshot) -> Result<(), EngineError> {
        match (&mut self.delegate, snapshot) {
            (PhaseDelegate::UserAction(delegate), snapshot) => delegate.restore(snapshot),
            (_, DelegateSnapshot::Empty) => Ok(()),
            (_, other) => Err(EngineError::BadSnapshot {
                phase: self.name.clone(),
                detail: format!("unexpected snapshot {other:?}"),
            }),
        }
    }

    fn order_error(&self, operation: &'static str, state: PhaseState) -> EngineError {
        EngineError::PhaseOrder {
            phase: self.name.clone(),
            operation,
            state: match state {
                PhaseState::NotStarted => "not started",
                PhaseState::Started => "started",
                PhaseState::AwaitingInput => "awaiting input",
                PhaseState::Ended => "ended",
            },
        }
    }
}

/// Dispatch table from phase name to a fresh delegate.
pub struct PhaseTable {
    factories: Vec<(String, fn() -> PhaseDelegate)>,
}

impl PhaseTable {
    /// The standard phase set.
    pub fn standard() -> Self {
        let mut table = Self {
            factories: Vec::new(),
        };
        table.register("edit", || PhaseDelegate::Edit(EditDelegate::new()));
        table.register("user_action", || {
            PhaseDelegate::UserAction(UserActionDelegate::new())
        });
        table.register("bombardment", || {
            PhaseDelegate::Bombardment(BombardmentDelegate::new())
        });
        table
    }

    pub fn register(&mut self, name: impl Into<String>, factory: fn() -> PhaseDelegate) {
        self.factories.push((name.into(), factory));
    }

    /// Builds a machine for the named phase, if registered.
    pub fn create(&self, name: &str) -> Option<PhaseMachine> {
        self.factories
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(registered, factory)| PhaseMachine::new(registered.clone(), factory()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{EngineBridge, NullBroadcaster, PlayerDirectory};
    use crate::change::ChangeJournal;
    use crate::dice::ScriptedDice;
    use crate::history::HistoryLog;
    use crate::ids::PlayerId;
    use crate::state::{StateLock, fixtures};

    #[test]
    fn lifecycle_rejects_out_of_order_calls() {
        let fixture = fixtures::two_player_front();
        let lock = StateLock::new(fixture.state);
        let mut journal = ChangeJournal::new();
        let mut history = HistoryLog::new();
        let mut dice = ScriptedDice::default();
        let players = PlayerDirectory::new();
        let sound = NullBroadcaster;
        let display = NullBroadcaster;
        let mut bridge = EngineBridge::new(
            &lock,
            &mut journal,
            &mut history,
            &mut dice,
            &players,
            &sound,
            &display,
            PlayerId(0),
        );

        let table = PhaseTable::standard();
        let mut machine = table.create("edit").expect("edit phase registered");

        assert!(matches!(
            machine.end(&mut bridge),
            Err(EngineError::PhaseOrder { .. })
        ));
        machine.start(&mut bridge).unwrap();
        assert!(matches!(
            machine.start(&mut bridge),
            Err(EngineError::PhaseOrder { .. })
        ));
        machine.end(&mut bridge).unwrap();
        // Phases run again next round.
        machine.start(&mut bridge).unwrap();
    }

    #[test]
    fn standard_table_knows_all_phases() {
        let table = PhaseTable::standard();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, vec!["edit", "user_action", "bombardment"]);
        assert!(table.create("production").is_none());
    }

    #[test]
    fn delegate_snapshots_serialize() {
        let snapshot = DelegateSnapshot::UserAction {
            attempts_used: [(crate::ids::ActionId(0), 1)].into_iter().collect(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DelegateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }
}
