//! Region Triggers (§4.L): named circles/rectangles that emit
//! `ENTERED_REGION`/`EXITED_REGION` deltas as the tracked entity set
//! changes.
//!
//! Grounded on `original_source/src/game/region.c`'s `struct region` (a
//! `type` tag over a `radius`/`{xlen, zlen}` union, plus `curr_ents` and
//! `prev_ents`); this port keeps the same previous-vs-current membership
//! diffing instead of a chunk-granular dirty list, since the position
//! index's range queries make a full per-tick membership recompute cheap
//! enough without the original's chunk index.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { xlen: f32, zlen: f32 },
}

impl Shape {
    fn contains(&self, center: (f32, f32), point: (f32, f32)) -> bool {
        match *self {
            Shape::Circle { radius } => {
                let dx = point.0 - center.0;
                let dz = point.1 - center.1;
                dx * dx + dz * dz <= radius * radius
            }
            Shape::Rect { xlen, zlen } => {
                (point.0 - center.0).abs() <= xlen / 2.0 && (point.1 - center.1).abs() <= zlen / 2.0
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub shape: Shape,
    pub pos: (f32, f32),
    curr_ents: HashSet<EntityId>,
    prev_ents: HashSet<EntityId>,
}

impl Region {
    pub fn new(shape: Shape, pos: (f32, f32)) -> Self {
        Self {
            shape,
            pos,
            curr_ents: HashSet::new(),
            prev_ents: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionEvent {
    Entered,
    Exited,
}

/// The named-region table. `tick` recomputes membership from a caller-
/// supplied set of candidate entity positions and returns the delta events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionTable {
    regions: std::collections::HashMap<String, Region>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, shape: Shape, pos: (f32, f32)) {
        self.regions.insert(name.to_owned(), Region::new(shape, pos));
    }

    pub fn remove(&mut self, name: &str) {
        self.regions.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// Recompute every region's membership against `positions` (entity,
    /// xz), diffing against the previous tick's membership and returning
    /// `(region_name, event, entity)` for every entered/exited entity.
    ///
    /// Invariant upheld by construction: `entered ⊆ curr` and
    /// `exited ∩ curr = ∅`, since `curr` is rebuilt directly from the
    /// containment test, not mutated incrementally.
    pub fn tick(&mut self, positions: &[(EntityId, (f32, f32))]) -> Vec<(String, RegionEvent, EntityId)> {
        let mut events = Vec::new();
        for (name, region) in self.regions.iter_mut() {
            let new_curr: HashSet<EntityId> = positions
                .iter()
                .filter(|(_, xz)| region.shape.contains(region.pos, *xz))
                .map(|(uid, _)| *uid)
                .collect();

            for &entered in new_curr.difference(&region.curr_ents) {
                events.push((name.clone(), RegionEvent::Entered, entered));
            }
            for &exited in region.curr_ents.difference(&new_curr) {
                events.push((name.clone(), RegionEvent::Exited, exited));
            }

            region.prev_ents = std::mem::replace(&mut region.curr_ents, new_curr);
        }
        events
    }

    pub fn current_members(&self, name: &str) -> Option<&HashSet<EntityId>> {
        self.regions.get(name).map(|r| &r.curr_ents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(i: u32) -> EntityId {
        EntityId::new(i, 0)
    }

    #[test]
    fn entity_moving_into_circle_emits_entered() {
        let mut table = RegionTable::new();
        table.add("spawn", Shape::Circle { radius: 5.0 }, (0.0, 0.0));

        let events = table.tick(&[(eid(1), (2.0, 0.0))]);
        assert_eq!(events, vec![("spawn".to_owned(), RegionEvent::Entered, eid(1))]);
    }

    #[test]
    fn entity_leaving_emits_exited_next_tick() {
        let mut table = RegionTable::new();
        table.add("spawn", Shape::Circle { radius: 5.0 }, (0.0, 0.0));
        table.tick(&[(eid(1), (2.0, 0.0))]);

        let events = table.tick(&[(eid(1), (50.0, 0.0))]);
        assert_eq!(events, vec![("spawn".to_owned(), RegionEvent::Exited, eid(1))]);
    }

    #[test]
    fn stationary_member_produces_no_events() {
        let mut table = RegionTable::new();
        table.add("spawn", Shape::Circle { radius: 5.0 }, (0.0, 0.0));
        table.tick(&[(eid(1), (1.0, 0.0))]);
        let events = table.tick(&[(eid(1), (1.0, 0.0))]);
        assert!(events.is_empty());
    }

    #[test]
    fn rect_region_uses_half_extents() {
        let mut table = RegionTable::new();
        table.add("box", Shape::Rect { xlen: 10.0, zlen: 4.0 }, (0.0, 0.0));
        let events = table.tick(&[(eid(1), (4.9, 1.9)), (eid(2), (6.0, 0.0))]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].2, eid(1));
    }

    #[test]
    fn invariant_entered_is_subset_of_current_membership() {
        let mut table = RegionTable::new();
        table.add("spawn", Shape::Circle { radius: 5.0 }, (0.0, 0.0));
        table.tick(&[(eid(1), (2.0, 0.0)), (eid(2), (1.0, 0.0))]);
        let members = table.current_members("spawn").unwrap();
        assert!(members.contains(&eid(1)));
        assert!(members.contains(&eid(2)));
    }
}
