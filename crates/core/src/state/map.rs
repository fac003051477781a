//! Territories and the adjacency graph.

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, TerritoryId, UnitId};

/// A territory on the map.
///
/// Ownership, occupants, and production are part of the authoritative state
/// and are mutated only through [`crate::change::Change`]s. The geometry
/// flags are fixed at setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub owner: Option<PlayerId>,
    /// Occupying units, ordered by id for deterministic iteration.
    pub units: BTreeSet<UnitId>,
    /// Production value of the territory.
    pub production: u32,
    pub is_water: bool,
    pub is_impassable: bool,
    /// Whether attacks may route through this territory.
    pub allows_overflight: bool,
}

impl Territory {
    pub fn new(id: TerritoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            units: BTreeSet::new(),
            production: 0,
            is_water: false,
            is_impassable: false,
            allows_overflight: true,
        }
    }
}

/// Undirected adjacency between territories.
///
/// Edges all have unit length; distance between territories is the number
/// of steps on the shortest admissible route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    neighbors: FxHashMap<TerritoryId, Vec<TerritoryId>>,
}

impl GameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an undirected edge. Duplicate edges are ignored.
    pub fn connect(&mut self, a: TerritoryId, b: TerritoryId) {
        let forward = self.neighbors.entry(a).or_default();
        if !forward.contains(&b) {
            forward.push(b);
        }
        let backward = self.neighbors.entry(b).or_default();
        if !backward.contains(&a) {
            backward.push(a);
        }
    }

    pub fn neighbors(&self, territory: TerritoryId) -> &[TerritoryId] {
        self.neighbors
            .get(&territory)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Breadth-first search from `from`, bounded by `max_steps`.
    ///
    /// Every territory on a route, including the destination but not the
    /// origin, must satisfy `admit`. Returns reached territories with their
    /// step distance, in deterministic visit order.
    pub fn reachable(
        &self,
        from: TerritoryId,
        max_steps: u32,
        admit: impl Fn(TerritoryId) -> bool,
    ) -> Vec<(TerritoryId, u32)> {
        let mut seen = FxHashSet::default();
        seen.insert(from);
        let mut queue = VecDeque::new();
        queue.push_back((from, 0));
        let mut reached = Vec::new();

        while let Some((current, steps)) = queue.pop_front() {
            if steps == max_steps {
                continue;
            }
            for &next in self.neighbors(current) {
                if !seen.insert(next) || !admit(next) {
                    continue;
                }
                reached.push((next, steps + 1));
                queue.push_back((next, steps + 1));
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_map(len: u32) -> GameMap {
        let mut map = GameMap::new();
        for i in 1..len {
            map.connect(TerritoryId(i - 1), TerritoryId(i));
        }
        map
    }

    #[test]
    fn reachable_respects_the_step_limit() {
        let map = line_map(6);
        let reached = map.reachable(TerritoryId(0), 3, |_| true);
        let ids: Vec<u32> = reached.iter().map(|(t, _)| t.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(reached[2], (TerritoryId(3), 3));
    }

    #[test]
    fn reachable_stops_at_inadmissible_territories() {
        let map = line_map(5);
        // Blocking territory 2 cuts off everything behind it.
        let reached = map.reachable(TerritoryId(0), 4, |t| t != TerritoryId(2));
        let ids: Vec<u32> = reached.iter().map(|(t, _)| t.0).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn reachable_finds_shortest_route_around_a_block() {
        // 0-1-2 and 0-3-4-2: blocking 1 still reaches 2 at distance 3.
        let mut map = GameMap::new();
        map.connect(TerritoryId(0), TerritoryId(1));
        map.connect(TerritoryId(1), TerritoryId(2));
        map.connect(TerritoryId(0), TerritoryId(3));
        map.connect(TerritoryId(3), TerritoryId(4));
        map.connect(TerritoryId(4), TerritoryId(2));
        let reached = map.reachable(TerritoryId(0), 5, |t| t != TerritoryId(1));
        assert!(reached.contains(&(TerritoryId(2), 3)));
    }
}
