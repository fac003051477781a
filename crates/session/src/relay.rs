//! Bus-backed implementations of the bridge's broadcast capabilities.

use std::sync::Arc;

use frontline_core::bridge::{DisplayBroadcaster, SoundBroadcaster, SoundClip};
use frontline_core::dice::{DiceKind, RandomSource};
use frontline_core::error::EngineError;
use frontline_core::ids::PlayerId;

use crate::events::{EventBus, SessionEvent};

/// Publishes sounds and display messages on the session bus.
#[derive(Clone)]
pub struct BusBroadcaster {
    bus: Arc<EventBus>,
}

impl BusBroadcaster {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl SoundBroadcaster for BusBroadcaster {
    fn play_for_all(&self, clip: SoundClip, initiator: PlayerId) {
        self.bus.publish(SessionEvent::Sound {
            clip: clip.to_string(),
            initiator,
            recipients: None,
        });
    }

    fn play_for(&self, clip: SoundClip, recipients: &[PlayerId]) {
        self.bus.publish(SessionEvent::Sound {
            clip: clip.to_string(),
            initiator: recipients.first().copied().unwrap_or(PlayerId(0)),
            recipients: Some(recipients.to_vec()),
        });
    }
}

impl DisplayBroadcaster for BusBroadcaster {
    fn report_message(&self, recipients: &[PlayerId], message: &str) {
        self.bus.publish(SessionEvent::Message {
            recipients: recipients.to_vec(),
            text: message.to_string(),
        });
    }
}

/// Wraps the authoritative random source and relays every draw on the bus,
/// so every participant observes the identical sequence for the identical
/// call.
pub struct RelayedDice {
    inner: Box<dyn RandomSource>,
    bus: Arc<EventBus>,
}

impl RelayedDice {
    pub fn new(inner: Box<dyn RandomSource>, bus: Arc<EventBus>) -> Self {
        Self { inner, bus }
    }
}

impl RandomSource for RelayedDice {
    fn roll(
        &mut self,
        sides: u32,
        count: usize,
        player: PlayerId,
        kind: DiceKind,
        annotation: &str,
    ) -> Result<Vec<u32>, EngineError> {
        let rolls = self.inner.roll(sides, count, player, kind, annotation)?;
        self.bus.publish(SessionEvent::Dice {
            player,
            kind,
            sides,
            rolls: rolls.clone(),
            annotation: annotation.to_string(),
        });
        Ok(rolls)
    }
}
