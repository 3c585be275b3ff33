//! Position Index (§4.B): a point quadtree over (x, z) keyed by `EntityId`.
//!
//! Wraps [`crate::quadtree::Quadtree`] with the ECS-facing contract: a
//! `get`/`set` pair that keeps the quadtree and a `uid -> pos` lookup table
//! consistent, plus garrison/ungarrison to pull an entity out of the index
//! without despawning it (§3: "an entity is in the quadtree iff it is
//! active, not garrisoned, and not MARKER").

use std::collections::HashMap;

use skirmish_ecs::entity::EntityId;

use crate::quadtree::Quadtree;

/// `set`'s return value: the previous position, if any, so callers (region
/// triggers, fog) can diff old vs. new for enter/exit/vision bookkeeping.
pub struct MoveResult {
    pub old: Option<(f32, f32)>,
    pub new: (f32, f32),
}

pub struct PositionIndex {
    tree: Quadtree<EntityId>,
    /// Current (x, z) per indexed entity; `None` while garrisoned.
    positions: HashMap<EntityId, Option<(f32, f32)>>,
}

impl PositionIndex {
    pub fn new(xmin: f32, xmax: f32, zmin: f32, zmax: f32) -> Self {
        Self {
            tree: Quadtree::new(xmin, xmax, zmin, zmax),
            positions: HashMap::new(),
        }
    }

    /// Set (or insert) `uid`'s position. Removes the old quadtree entry (if
    /// any and not garrisoned) before inserting the new one.
    pub fn set(&mut self, uid: EntityId, xz: (f32, f32)) -> MoveResult {
        let old = self.positions.insert(uid, Some(xz)).flatten();
        if let Some(old_xz) = old {
            self.tree.delete(old_xz.0, old_xz.1, &uid);
        }
        self.tree.insert(xz.0, xz.1, uid);
        MoveResult { old, new: xz }
    }

    /// Current position, or `None` if `uid` is not indexed or is garrisoned.
    pub fn get(&self, uid: EntityId) -> Option<(f32, f32)> {
        self.positions.get(&uid).copied().flatten()
    }

    pub fn nearest_with_predicate(
        &self,
        xz: (f32, f32),
        max_radius: f32,
        pred: impl FnMut(&EntityId) -> bool,
    ) -> Option<EntityId> {
        self.tree.nearest_with_predicate(xz.0, xz.1, max_radius, pred)
    }

    pub fn in_circle(&self, xz: (f32, f32), radius: f32, maxout: usize) -> Vec<EntityId> {
        self.tree.in_range_circle(xz.0, xz.1, radius, maxout)
    }

    pub fn in_rect(&self, min: (f32, f32), max: (f32, f32), maxout: usize) -> Vec<EntityId> {
        self.tree.in_range_rect(min, max, maxout)
    }

    /// Pull `uid` out of the quadtree (it is now carried by a garrison) while
    /// remembering it is still a tracked entity.
    pub fn garrison(&mut self, uid: EntityId) {
        if let Some(Some(xz)) = self.positions.get(&uid).copied() {
            self.tree.delete(xz.0, xz.1, &uid);
        }
        self.positions.insert(uid, None);
    }

    /// Re-insert `uid` into the quadtree at `xz` after disembarking.
    pub fn ungarrison(&mut self, uid: EntityId, xz: (f32, f32)) {
        self.tree.insert(xz.0, xz.1, uid);
        self.positions.insert(uid, Some(xz));
    }

    /// Remove `uid` from the index entirely (entity despawned).
    pub fn remove(&mut self, uid: EntityId) {
        if let Some(Some(xz)) = self.positions.remove(&uid) {
            self.tree.delete(xz.0, xz.1, &uid);
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
