//! Random sources.
//!
//! All rule-logic randomness funnels through [`RandomSource`] via the
//! bridge; no delegate may draw entropy any other way. In a networked
//! session the host's source is authoritative and every participant
//! observes the identical sequence for the identical call — the session
//! layer relays each draw to peers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ids::PlayerId;

/// Category of a dice draw, recorded for audit and statistics.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum DiceKind {
    Combat,
    Bombing,
    NonCombat,
}

/// Source of synchronized randomness.
pub trait RandomSource: Send {
    /// Draws `count` zero-based rolls in `[0, sides)`.
    ///
    /// `player`, `kind`, and `annotation` attribute the draw for audit; they
    /// must not influence the values.
    fn roll(
        &mut self,
        sides: u32,
        count: usize,
        player: PlayerId,
        kind: DiceKind,
        annotation: &str,
    ) -> Result<Vec<u32>, EngineError>;
}

/// Deterministic PCG-XSH-RR stream.
///
/// Same seed, same sequence — the property the cross-peer determinism
/// contract rests on. State is 64 bits advanced by an LCG step; output is
/// the xorshift-high / random-rotate permutation of the pre-step state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcgDice {
    state: u64,
}

impl PcgDice {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn seeded(seed: u64) -> Self {
        Self {
            // One step scrambles seeds that differ only in low bits.
            state: Self::step(seed),
        }
    }

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    fn next_u32(&mut self) -> u32 {
        let out = Self::output(self.state);
        self.state = Self::step(self.state);
        out
    }
}

impl RandomSource for PcgDice {
    fn roll(
        &mut self,
        sides: u32,
        count: usize,
        _player: PlayerId,
        _kind: DiceKind,
        _annotation: &str,
    ) -> Result<Vec<u32>, EngineError> {
        if sides == 0 {
            return Err(EngineError::invariant("dice with zero sides"));
        }
        Ok((0..count).map(|_| self.next_u32() % sides).collect())
    }
}

/// Replays a fixed script of zero-based rolls. For tests and for verifying
/// that an outcome is a pure function of its dice sequence.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    script: VecDeque<u32>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: rolls.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for ScriptedDice {
    fn roll(
        &mut self,
        sides: u32,
        count: usize,
        _player: PlayerId,
        _kind: DiceKind,
        annotation: &str,
    ) -> Result<Vec<u32>, EngineError> {
        if sides == 0 {
            return Err(EngineError::invariant("dice with zero sides"));
        }
        let mut rolls = Vec::with_capacity(count);
        for _ in 0..count {
            let roll = self.script.pop_front().ok_or_else(|| {
                EngineError::invariant(format!("dice script exhausted during '{annotation}'"))
            })?;
            if roll >= sides {
                return Err(EngineError::invariant(format!(
                    "scripted roll {roll} does not fit a d{sides}"
                )));
            }
            rolls.push(roll);
        }
        Ok(rolls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PcgDice::seeded(42);
        let mut b = PcgDice::seeded(42);
        let roll_a = a.roll(6, 10, PlayerId(0), DiceKind::Bombing, "test").unwrap();
        let roll_b = b.roll(6, 10, PlayerId(0), DiceKind::Bombing, "test").unwrap();
        assert_eq!(roll_a, roll_b);
        assert!(roll_a.iter().all(|&r| r < 6));
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = PcgDice::seeded(1);
        let mut b = PcgDice::seeded(2);
        let roll_a = a.roll(1000, 8, PlayerId(0), DiceKind::Combat, "test").unwrap();
        let roll_b = b.roll(1000, 8, PlayerId(0), DiceKind::Combat, "test").unwrap();
        assert_ne!(roll_a, roll_b);
    }

    #[test]
    fn scripted_dice_replay_and_exhaustion() {
        let mut dice = ScriptedDice::new([2, 0, 5]);
        assert_eq!(
            dice.roll(6, 2, PlayerId(0), DiceKind::Bombing, "x").unwrap(),
            vec![2, 0]
        );
        assert_eq!(dice.remaining(), 1);
        assert!(dice.roll(6, 2, PlayerId(0), DiceKind::Bombing, "x").is_err());
    }

    #[test]
    fn scripted_roll_must_fit_the_die() {
        let mut dice = ScriptedDice::new([7]);
        assert!(dice.roll(6, 1, PlayerId(0), DiceKind::Bombing, "x").is_err());
    }
}
