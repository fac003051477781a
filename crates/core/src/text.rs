//! Human-readable formatting for history events and notifications.

use std::collections::BTreeMap;

use crate::ids::{PlayerId, TerritoryId, UnitId};
use crate::state::GameState;

/// "2 infantry, 1 rocket launcher" for a collection of unit ids.
pub fn describe_units(state: &GameState, units: impl IntoIterator<Item = UnitId>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut unknown = 0usize;
    for id in units {
        match state
            .units
            .get(&id)
            .and_then(|unit| state.data.unit_types.get(unit.unit_type))
        {
            Some(data) => *counts.entry(data.name.as_str()).or_default() += 1,
            None => unknown += 1,
        }
    }
    let mut parts: Vec<String> = counts
        .into_iter()
        .map(|(name, count)| format!("{count} {name}"))
        .collect();
    if unknown > 0 {
        parts.push(format!("{unknown} unknown"));
    }
    if parts.is_empty() {
        "no units".to_string()
    } else {
        parts.join(", ")
    }
}

/// The player's display name, falling back to the id.
pub fn player_name(state: &GameState, player: PlayerId) -> String {
    state
        .players
        .get(&player)
        .map(|record| record.name.clone())
        .unwrap_or_else(|| player.to_string())
}

/// The territory's display name, falling back to the id.
pub fn territory_name(state: &GameState, territory: TerritoryId) -> String {
    state
        .territories
        .get(&territory)
        .map(|record| record.name.clone())
        .unwrap_or_else(|| territory.to_string())
}

/// "3, 5, 1" for one-based die results.
pub fn dice_text(rolls: &[u32]) -> String {
    rolls
        .iter()
        .map(|roll| roll.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
