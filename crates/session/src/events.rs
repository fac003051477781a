//! Topic-based event bus for presentation and synchronization side
//! effects.
//!
//! Consumers subscribe to the topics they care about; publishing is
//! best-effort and never affects rule outcomes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use frontline_core::dice::DiceKind;
use frontline_core::ids::PlayerId;

/// Topics for event routing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Sounds and display messages.
    Presentation,
    /// Every dice draw, relayed so peers observe the authoritative rolls.
    Dice,
    /// Phase transitions and session lifecycle.
    Lifecycle,
}

/// Event wrapper carrying the typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    Sound {
        clip: String,
        initiator: PlayerId,
        /// `None` broadcasts to everyone.
        recipients: Option<Vec<PlayerId>>,
    },
    Message {
        recipients: Vec<PlayerId>,
        text: String,
    },
    Dice {
        player: PlayerId,
        kind: DiceKind,
        sides: u32,
        rolls: Vec<u32>,
        annotation: String,
    },
    Phase {
        name: String,
        state: String,
        player: PlayerId,
    },
}

impl SessionEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SessionEvent::Sound { .. } | SessionEvent::Message { .. } => Topic::Presentation,
            SessionEvent::Dice { .. } => Topic::Dice,
            SessionEvent::Phase { .. } => Topic::Lifecycle,
        }
    }
}

/// Topic-based event bus.
pub struct EventBus {
    channels: HashMap<Topic, broadcast::Sender<SessionEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(128)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut channels = HashMap::new();
        channels.insert(Topic::Presentation, broadcast::channel(capacity).0);
        channels.insert(Topic::Dice, broadcast::channel(capacity).0);
        channels.insert(Topic::Lifecycle, broadcast::channel(capacity).0);
        Self { channels }
    }

    /// Publishes to the event's topic. No subscribers is normal, not an
    /// error.
    pub fn publish(&self, event: SessionEvent) {
        let topic = event.topic();
        if let Some(sender) = self.channels.get(&topic)
            && sender.send(event).is_err()
        {
            tracing::trace!(?topic, "no subscribers for topic");
        }
    }

    /// Subscribes to a single topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SessionEvent> {
        self.channels
            .get(&topic)
            .expect("topic channel not initialized")
            .subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn topics_route_independently() {
        let bus = EventBus::new();
        let mut dice = bus.subscribe(Topic::Dice);
        let mut presentation = bus.subscribe(Topic::Presentation);

        bus.publish(SessionEvent::Dice {
            player: PlayerId(0),
            kind: DiceKind::Bombing,
            sides: 6,
            rolls: vec![3],
            annotation: "test".into(),
        });

        assert!(matches!(dice.try_recv(), Ok(SessionEvent::Dice { .. })));
        assert!(presentation.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(SessionEvent::Message {
            recipients: vec![],
            text: "nobody listening".into(),
        });
    }
}
