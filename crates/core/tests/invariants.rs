//! Algebraic properties of the change journal.
//!
//! Random sequences of changes are applied against the fixture front and
//! checked for the three load-bearing guarantees: every change undoes
//! bit-for-bit, a recorded journal replays to the live state, and no
//! sequence of accepted changes drives a resource negative.

use proptest::prelude::*;

use frontline_core::change::{Change, ChangeJournal};
use frontline_core::ids::{PlayerId, TerritoryId, UnitId};
use frontline_core::state::fixtures;
use frontline_core::state::{GameState, Unit};

/// A change request that may or may not be admissible against the current
/// state; inadmissible ones must be refused without corrupting anything.
#[derive(Clone, Debug)]
enum Op {
    ToggleEdit,
    MarkMoved { unit: u8, moved: bool },
    Damage { unit: u8, amount: u32 },
    Resources { player: u8, delta: i64 },
    Relations { to_war: bool },
    Conquer { territory: u8, conquered: bool },
    Tracker { territory: u8, delta: i64 },
    Spawn { territory: u8 },
    Despawn { unit: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::ToggleEdit),
        (any::<u8>(), any::<bool>()).prop_map(|(unit, moved)| Op::MarkMoved { unit, moved }),
        (any::<u8>(), 0u32..25).prop_map(|(unit, amount)| Op::Damage { unit, amount }),
        (any::<u8>(), -15i64..15).prop_map(|(player, delta)| Op::Resources { player, delta }),
        any::<bool>().prop_map(|to_war| Op::Relations { to_war }),
        (0u8..6, any::<bool>())
            .prop_map(|(territory, conquered)| Op::Conquer { territory, conquered }),
        (0u8..6, -4i64..8).prop_map(|(territory, delta)| Op::Tracker { territory, delta }),
        (0u8..6).prop_map(|territory| Op::Spawn { territory }),
        any::<u8>().prop_map(|unit| Op::Despawn { unit }),
    ]
}

fn pick_unit(state: &GameState, index: u8) -> Option<UnitId> {
    let units: Vec<UnitId> = state.units.keys().copied().collect();
    if units.is_empty() {
        None
    } else {
        Some(units[index as usize % units.len()])
    }
}

fn pick_player(state: &GameState, index: u8) -> PlayerId {
    let players: Vec<PlayerId> = state.players.keys().copied().collect();
    players[index as usize % players.len()]
}

/// Builds the concrete change for an op, or `None` when the op does not
/// apply to the current state.
fn materialize(fixture: &fixtures::FrontFixture, state: &GameState, op: &Op) -> Option<Change> {
    match op {
        Op::ToggleEdit => Some(Change::set_edit_mode(state, !state.edit_mode)),
        Op::MarkMoved { unit, moved } => {
            let unit = pick_unit(state, *unit)?;
            Change::set_moved(state, unit, *moved).ok()
        }
        Op::Damage { unit, amount } => {
            let unit = pick_unit(state, *unit)?;
            Change::set_bombing_damage(state, unit, *amount).ok()
        }
        Op::Resources { player, delta } => Some(Change::ResourceDelta {
            player: pick_player(state, *player),
            resource: fixture.resource,
            delta: *delta,
        }),
        Op::Relations { to_war } => Some(Change::set_relationship(
            state,
            fixture.attacker,
            fixture.defender,
            if *to_war { fixture.war } else { fixture.peace },
        )),
        Op::Conquer {
            territory,
            conquered,
        } => Change::set_conquered(state, TerritoryId(*territory as u32), *conquered).ok(),
        Op::Tracker { territory, delta } => Some(Change::TerritoryDamageDelta {
            territory: TerritoryId(*territory as u32),
            delta: *delta,
        }),
        Op::Spawn { territory } => {
            let id = state.next_unit_id();
            Some(Change::AddUnits {
                territory: TerritoryId(*territory as u32),
                units: vec![Unit::new(id, fixture.infantry_type, fixture.attacker)],
            })
        }
        Op::Despawn { unit } => {
            let unit = pick_unit(state, *unit)?;
            let territory = state.territory_of(unit)?;
            Change::remove_units(state, territory, &[unit]).ok()
        }
    }
}

proptest! {
    #[test]
    fn accepted_changes_replay_and_undo_exactly(ops in proptest::collection::vec(op_strategy(), 0..16)) {
        let fixture = fixtures::two_player_front();
        let initial = fixture.state.clone();
        let mut state = fixture.state.clone();
        let mut journal = ChangeJournal::new();

        for op in &ops {
            let Some(change) = materialize(&fixture, &state, op) else {
                continue;
            };
            // Inadmissible changes (e.g. a resource going negative) must
            // refuse cleanly; admissible ones are recorded.
            let _ = journal.apply(&mut state, change);
        }

        // No accepted sequence may leave a negative balance (balances are
        // unsigned, so it suffices that every lookup still works).
        for player in state.players.keys() {
            prop_assert!(state.player(*player).is_ok());
        }

        // Replay from the initial state lands on the live state.
        let replayed = ChangeJournal::replay(&initial, journal.applied()).unwrap();
        prop_assert_eq!(&replayed, &state);

        // Undoing everything, most recent first, restores the initial
        // state bit-for-bit.
        let applied = journal.len();
        journal.undo_last_n(&mut state, applied).unwrap();
        prop_assert_eq!(&state, &initial);
    }

    #[test]
    fn single_changes_satisfy_the_invert_law(op in op_strategy()) {
        let fixture = fixtures::two_player_front();
        let before = fixture.state.clone();
        let mut state = fixture.state.clone();

        let Some(change) = materialize(&fixture, &state, &op) else {
            return Ok(());
        };
        if change.perform(&mut state).is_err() {
            // A refused change must leave no trace at all.
            prop_assert_eq!(&state, &before);
            return Ok(());
        }
        change.invert().perform(&mut state).unwrap();
        prop_assert_eq!(&state, &before);
    }
}
