//! Client-facing handle and the worker thread behind it.
//!
//! The worker owns the [`GameSession`] and is the single writer; commands
//! arrive over an mpsc channel and answer through oneshot replies. Delegate
//! execution may block on remote players, so the worker runs on its own
//! thread, off the async runtime. Dropping the handle closes the channel
//! and tears the worker down; any delegate blocked on a player query then
//! observes a disconnect and unwinds fatally, never half-applied.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use frontline_core::error::Ruling;
use frontline_core::ids::{
    ActionId, PlayerId, RelationshipTypeId, ResourceId, TerritoryId, UnitId, UnitTypeId,
};
use frontline_core::phase::DelegateSnapshot;
use frontline_core::state::StateLock;

use crate::error::{Result, SessionError};
use crate::events::{SessionEvent, Topic};
use crate::session::GameSession;
use crate::snapshot::{CatchUpPacket, SessionSnapshot};

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    StartPhase {
        name: String,
        player: PlayerId,
        reply: Reply<()>,
    },
    EndPhase {
        reply: Reply<DelegateSnapshot>,
    },
    SetEditMode {
        enabled: bool,
        reply: Reply<Ruling>,
    },
    RemoveUnits {
        territory: TerritoryId,
        units: Vec<UnitId>,
        reply: Reply<Ruling>,
    },
    AddUnits {
        territory: TerritoryId,
        units: Vec<(UnitTypeId, PlayerId)>,
        reply: Reply<Ruling>,
    },
    SetResourceTotal {
        player: PlayerId,
        resource: ResourceId,
        new_total: i64,
        reply: Reply<Ruling>,
    },
    ChangeRelationships {
        changes: Vec<(PlayerId, PlayerId, RelationshipTypeId)>,
        reply: Reply<Ruling>,
    },
    AttemptUserAction {
        action: ActionId,
        reply: Reply<Ruling>,
    },
    FireBombardment {
        reply: Reply<()>,
    },
    Undo {
        reply: Reply<bool>,
    },
    SaveSnapshot {
        reply: Reply<SessionSnapshot>,
    },
    CatchUp {
        reply: Reply<CatchUpPacket>,
    },
}

/// Cloneable async facade over the session worker.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    bus: Arc<crate::events::EventBus>,
    state: Arc<StateLock>,
}

impl SessionHandle {
    /// Moves the session onto its worker thread and returns the handle.
    pub fn spawn(session: GameSession) -> Self {
        let bus = session.bus_handle();
        let state = session.state();
        let (commands, rx) = mpsc::channel(32);
        std::thread::spawn(move || run_worker(session, rx));
        Self {
            commands,
            bus,
            state,
        }
    }

    /// Read access to the state store for presentation.
    pub fn state(&self) -> Arc<StateLock> {
        self.state.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe(topic)
    }

    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::WorkerGone)?;
        rx.await.map_err(|_| SessionError::WorkerGone)?
    }

    pub async fn start_phase(&self, name: &str, player: PlayerId) -> Result<()> {
        let name = name.to_string();
        self.call(|reply| Command::StartPhase {
            name,
            player,
            reply,
        })
        .await
    }

    pub async fn end_phase(&self) -> Result<DelegateSnapshot> {
        self.call(|reply| Command::EndPhase { reply }).await
    }

    pub async fn set_edit_mode(&self, enabled: bool) -> Result<Ruling> {
        self.call(|reply| Command::SetEditMode { enabled, reply })
            .await
    }

    pub async fn remove_units(&self, territory: TerritoryId, units: Vec<UnitId>) -> Result<Ruling> {
        self.call(|reply| Command::RemoveUnits {
            territory,
            units,
            reply,
        })
        .await
    }

    pub async fn add_units(
        &self,
        territory: TerritoryId,
        units: Vec<(UnitTypeId, PlayerId)>,
    ) -> Result<Ruling> {
        self.call(|reply| Command::AddUnits {
            territory,
            units,
            reply,
        })
        .await
    }

    pub async fn set_resource_total(
        &self,
        player: PlayerId,
        resource: ResourceId,
        new_total: i64,
    ) -> Result<Ruling> {
        self.call(|reply| Command::SetResourceTotal {
            player,
            resource,
            new_total,
            reply,
        })
        .await
    }

    pub async fn change_relationships(
        &self,
        changes: Vec<(PlayerId, PlayerId, RelationshipTypeId)>,
    ) -> Result<Ruling> {
        self.call(|reply| Command::ChangeRelationships { changes, reply })
            .await
    }

    pub async fn attempt_user_action(&self, action: ActionId) -> Result<Ruling> {
        self.call(|reply| Command::AttemptUserAction { action, reply })
            .await
    }

    pub async fn fire_bombardment(&self) -> Result<()> {
        self.call(|reply| Command::FireBombardment { reply }).await
    }

    pub async fn undo_last(&self) -> Result<bool> {
        self.call(|reply| Command::Undo { reply }).await
    }

    pub async fn save_snapshot(&self) -> Result<SessionSnapshot> {
        self.call(|reply| Command::SaveSnapshot { reply }).await
    }

    pub async fn catch_up_packet(&self) -> Result<CatchUpPacket> {
        self.call(|reply| Command::CatchUp { reply }).await
    }
}

fn run_worker(mut session: GameSession, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.blocking_recv() {
        handle_command(&mut session, command);
    }
    tracing::info!("session worker stopped");
}

fn handle_command(session: &mut GameSession, command: Command) {
    match command {
        Command::StartPhase {
            name,
            player,
            reply,
        } => {
            let _ = reply.send(session.start_phase(&name, player));
        }
        Command::EndPhase { reply } => {
            let _ = reply.send(session.end_phase());
        }
        Command::SetEditMode { enabled, reply } => {
            let _ = reply.send(session.set_edit_mode(enabled));
        }
        Command::RemoveUnits {
            territory,
            units,
            reply,
        } => {
            let _ = reply.send(session.remove_units(territory, &units));
        }
        Command::AddUnits {
            territory,
            units,
            reply,
        } => {
            let _ = reply.send(session.add_units(territory, &units));
        }
        Command::SetResourceTotal {
            player,
            resource,
            new_total,
            reply,
        } => {
            let _ = reply.send(session.set_resource_total(player, resource, new_total));
        }
        Command::ChangeRelationships { changes, reply } => {
            let _ = reply.send(session.change_relationships(&changes));
        }
        Command::AttemptUserAction { action, reply } => {
            let _ = reply.send(session.attempt_user_action(action));
        }
        Command::FireBombardment { reply } => {
            let _ = reply.send(session.fire_bombardment());
        }
        Command::Undo { reply } => {
            let _ = reply.send(session.undo_last());
        }
        Command::SaveSnapshot { reply } => {
            let _ = reply.send(Ok(session.save_snapshot()));
        }
        Command::CatchUp { reply } => {
            let _ = reply.send(Ok(session.catch_up_packet()));
        }
    }
}
