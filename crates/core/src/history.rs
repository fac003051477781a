//! Causal, append-only history of what happened and why.
//!
//! Delegates narrate their work through [`HistoryWriter`]: a parent event
//! describing the action, with child events for details such as dice
//! results or destroyed units. Events are never mutated or reordered once
//! written; concurrent readers only ever observe a prefix of the final log.

use serde::{Deserialize, Serialize};

use crate::ids::EntityRef;

/// Index of an event in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub usize);

/// One log entry. `parent` nests child events under the event that caused
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: EventId,
    pub parent: Option<EventId>,
    pub description: String,
    /// Entities this event is about, for UI highlighting and audit.
    pub related: Vec<EntityRef>,
}

/// Append-only event logger handed to delegates by the bridge.
pub trait HistoryWriter {
    /// Opens a new top-level event and makes it the parent for subsequent
    /// children.
    fn start_event(&mut self, description: String) -> EventId;

    /// Appends a child under the most recently started event. Without an
    /// open parent the entry is recorded at top level.
    fn add_child(&mut self, description: String, related: Vec<EntityRef>) -> EventId;
}

/// In-memory history log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog {
    events: Vec<HistoryEvent>,
    current: Option<EventId>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Children of `parent`, in write order.
    pub fn children(&self, parent: EventId) -> impl Iterator<Item = &HistoryEvent> {
        self.events
            .iter()
            .filter(move |event| event.parent == Some(parent))
    }

    fn push(&mut self, parent: Option<EventId>, description: String, related: Vec<EntityRef>) -> EventId {
        let id = EventId(self.events.len());
        self.events.push(HistoryEvent {
            id,
            parent,
            description,
            related,
        });
        id
    }
}

impl HistoryWriter for HistoryLog {
    fn start_event(&mut self, description: String) -> EventId {
        let id = self.push(None, description, Vec::new());
        self.current = Some(id);
        id
    }

    fn add_child(&mut self, description: String, related: Vec<EntityRef>) -> EventId {
        self.push(self.current, description, related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UnitId;

    #[test]
    fn children_nest_under_the_started_event() {
        let mut log = HistoryLog::new();
        let first = log.start_event("first action".into());
        log.add_child("detail a".into(), vec![UnitId(1).into()]);
        let second = log.start_event("second action".into());
        log.add_child("detail b".into(), vec![]);

        assert_eq!(log.children(first).count(), 1);
        let detail_b = log.children(second).next().unwrap();
        assert_eq!(detail_b.description, "detail b");
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn orphan_children_record_at_top_level() {
        let mut log = HistoryLog::new();
        let id = log.add_child("stray".into(), vec![]);
        assert_eq!(log.events()[id.0].parent, None);
    }
}
