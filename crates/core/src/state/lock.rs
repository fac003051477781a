//! Explicit read/write lock around the state store.
//!
//! Exactly one writer (the change journal, driven by the host session)
//! mutates the state; presentation threads take short-lived read guards.
//! The write side is crate-private so no caller outside the engine can
//! mutate state behind the journal's back.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::GameState;

/// Reader/writer lock over [`GameState`].
///
/// Read guards must be held briefly and never across a blocking call
/// (remote-player queries, dice draws); delegates drop their guard before
/// touching the bridge.
#[derive(Debug)]
pub struct StateLock {
    inner: RwLock<GameState>,
}

impl StateLock {
    pub fn new(state: GameState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    /// Acquires a shared read guard.
    pub fn read(&self) -> RwLockReadGuard<'_, GameState> {
        self.inner.read().expect("state lock poisoned")
    }

    /// Acquires the exclusive write guard. Crate-private: all mutation flows
    /// through the change journal.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, GameState> {
        self.inner.write().expect("state lock poisoned")
    }

    /// Clones the current state, e.g. for snapshots or replay baselines.
    pub fn snapshot(&self) -> GameState {
        self.read().clone()
    }
}
