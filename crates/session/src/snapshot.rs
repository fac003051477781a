//! Serializable session artifacts: save snapshots and catch-up packets.
//!
//! Where these bytes live (files, sockets) is the embedder's concern; the
//! session only defines the payloads and their encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use frontline_core::change::{Change, ChangeJournal};
use frontline_core::error::EngineError;
use frontline_core::phase::DelegateSnapshot;
use frontline_core::state::GameState;

use crate::error::SessionError;

/// A save point: the state store plus each delegate's small private
/// snapshot, keyed by phase name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: GameState,
    pub delegates: BTreeMap<String, DelegateSnapshot>,
}

impl SessionSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SessionError> {
        bincode::serialize(self).map_err(|error| SessionError::Encode(error.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        bincode::deserialize(bytes).map_err(|error| SessionError::Decode(error.to_string()))
    }
}

/// What a late-joining peer needs to reconstruct the authoritative state:
/// the initial state and the ordered change list to replay over it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatchUpPacket {
    pub initial: GameState,
    pub changes: Vec<Change>,
}

impl CatchUpPacket {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SessionError> {
        bincode::serialize(self).map_err(|error| SessionError::Encode(error.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        bincode::deserialize(bytes).map_err(|error| SessionError::Decode(error.to_string()))
    }

    /// Replays the packet into the final state.
    pub fn rebuild(&self) -> Result<GameState, EngineError> {
        ChangeJournal::replay(&self.initial, &self.changes)
    }
}
