//! The append-only change journal.

use crate::error::EngineError;
use crate::state::GameState;

use super::Change;

/// Ordered record of every change applied in the session.
///
/// The journal is the replay backbone: given the initial state and this
/// list, [`ChangeJournal::replay`] reproduces the final state exactly. That
/// underlies save/undo and network catch-up (a late-joining peer replays
/// history instead of transferring live state).
///
/// The record is append-only during normal play. Undo never truncates it:
/// it appends the inverse of the most recent entry and applies that, so a
/// replay of the full journal — undos included — still lands on the live
/// state.
#[derive(Clone, Debug, Default)]
pub struct ChangeJournal {
    applied: Vec<Change>,
}

impl ChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Performs the change against `state` and records it.
    ///
    /// Fails only on invariant violations; a failed group change has
    /// already rolled itself back and nothing is recorded.
    pub fn apply(&mut self, state: &mut GameState, change: Change) -> Result<(), EngineError> {
        change.perform(state)?;
        tracing::debug!(entry = self.applied.len(), "change applied");
        self.applied.push(change);
        Ok(())
    }

    pub fn applied(&self) -> &[Change] {
        &self.applied
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Undoes the most recent entry by applying and recording its inverse.
    /// Returns `false` when the journal is empty.
    pub fn undo_last(&mut self, state: &mut GameState) -> Result<bool, EngineError> {
        let Some(last) = self.applied.last() else {
            return Ok(false);
        };
        let inverse = last.invert();
        inverse.perform(state)?;
        self.applied.push(inverse);
        Ok(true)
    }

    /// Undoes the last `count` entries, most recent first.
    pub fn undo_last_n(&mut self, state: &mut GameState, count: usize) -> Result<(), EngineError> {
        // Each undo appends, so take indices before the first append.
        let live = self.applied.len();
        for index in (live.saturating_sub(count)..live).rev() {
            let inverse = self.applied[index].invert();
            inverse.perform(state)?;
            self.applied.push(inverse);
        }
        Ok(())
    }

    /// [`ChangeJournal::apply`] through the state lock, for hosts that hold
    /// the store behind [`crate::state::StateLock`].
    pub fn apply_locked(
        &mut self,
        lock: &crate::state::StateLock,
        change: Change,
    ) -> Result<(), EngineError> {
        let mut state = lock.write();
        self.apply(&mut state, change)
    }

    /// [`ChangeJournal::undo_last`] through the state lock.
    pub fn undo_last_locked(
        &mut self,
        lock: &crate::state::StateLock,
    ) -> Result<bool, EngineError> {
        let mut state = lock.write();
        self.undo_last(&mut state)
    }

    /// Replays a recorded change list over a copy of `initial`.
    pub fn replay(initial: &GameState, changes: &[Change]) -> Result<GameState, EngineError> {
        let mut state = initial.clone();
        for (entry, change) in changes.iter().enumerate() {
            change.perform(&mut state).map_err(|error| {
                tracing::debug!(entry, %error, "replay diverged");
                error
            })?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::state::fixtures;

    #[test]
    fn replay_reproduces_final_state() {
        let fixture = fixtures::two_player_front();
        let initial = fixture.state.clone();
        let mut state = fixture.state;
        let mut journal = ChangeJournal::new();

        let edit_change = Change::set_edit_mode(&state, true);
        journal.apply(&mut state, edit_change).unwrap();
        journal
            .apply(
                &mut state,
                Change::ResourceDelta {
                    player: fixture.defender,
                    resource: fixture.resource,
                    delta: -4,
                },
            )
            .unwrap();
        let bombing_change = Change::set_bombing_damage(&state, fixture.factory, 4).unwrap();
        journal.apply(&mut state, bombing_change).unwrap();

        let replayed = ChangeJournal::replay(&initial, journal.applied()).unwrap();
        assert_eq!(replayed, state);
    }

    #[test]
    fn undo_restores_previous_state_without_truncating() {
        let fixture = fixtures::two_player_front();
        let mut state = fixture.state;
        let mut journal = ChangeJournal::new();
        let before = state.clone();

        let action = Change::Group(vec![
            Change::set_moved(&state, fixture.launcher, true).unwrap(),
            Change::ResourceDelta {
                player: fixture.defender,
                resource: fixture.resource,
                delta: -3,
            },
        ]);
        journal.apply(&mut state, action).unwrap();
        assert_ne!(state, before);

        assert!(journal.undo_last(&mut state).unwrap());
        assert_eq!(state, before);
        assert_eq!(journal.len(), 2);

        // The journal with the undo included still replays to the live state.
        let replayed = ChangeJournal::replay(&before, journal.applied()).unwrap();
        assert_eq!(replayed, state);
    }

    #[test]
    fn undo_on_empty_journal_is_a_no_op() {
        let fixture = fixtures::two_player_front();
        let mut state = fixture.state;
        let mut journal = ChangeJournal::new();
        assert!(!journal.undo_last(&mut state).unwrap());
    }
}
