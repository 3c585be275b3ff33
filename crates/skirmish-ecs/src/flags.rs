//! Entity flag bitset.
//!
//! Mirrors the flag bits an entity can carry simultaneously: what it can be
//! selected/moved/targeted as, and a handful of lifecycle markers. Stored as
//! a single component (`EntityFlags`) on every active entity.

use bitflags::bitflags;

bitflags! {
    /// Per-entity capability/lifecycle bits.
    ///
    /// `MOVABLE` and `BUILDING` are mutually exclusive on creation
    /// (`EntityFlags::validate_initial`). `ZOMBIE` overrides `SELECTABLE`,
    /// `COMBATABLE`, `BUILDING`, `MOVABLE`, `BUILDER`, `HARVESTER`,
    /// `RESOURCE`, and `STORAGE_SITE` -- all are cleared on zombification
    /// (`EntityFlags::zombify`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct EntityFlags: u32 {
        const ANIMATED     = 1 << 0;
        const COLLISION    = 1 << 1;
        const SELECTABLE   = 1 << 2;
        const MOVABLE      = 1 << 3;
        const COMBATABLE   = 1 << 4;
        const INVISIBLE    = 1 << 5;
        /// Died in the simulation but still referenced by a scripting handle.
        const ZOMBIE       = 1 << 6;
        const MARKER       = 1 << 7;
        const BUILDING     = 1 << 8;
        const BUILDER      = 1 << 9;
        const TRANSLUCENT  = 1 << 10;
        const RESOURCE     = 1 << 11;
        const HARVESTER    = 1 << 12;
        const STORAGE_SITE = 1 << 13;
        const WATER        = 1 << 14;
        const AIR          = 1 << 15;
        const GARRISON     = 1 << 16;
        const GARRISONABLE = 1 << 17;
        const GARRISONED   = 1 << 18;
    }
}

/// Flags cleared by zombification (§3 DATA MODEL, Lifecycles).
const ZOMBIE_CLEARED: EntityFlags = EntityFlags::SELECTABLE
    .union(EntityFlags::COMBATABLE)
    .union(EntityFlags::BUILDING)
    .union(EntityFlags::MOVABLE)
    .union(EntityFlags::BUILDER)
    .union(EntityFlags::HARVESTER)
    .union(EntityFlags::RESOURCE)
    .union(EntityFlags::STORAGE_SITE);

impl EntityFlags {
    /// `MOVABLE` and `BUILDING` may never both be set on creation.
    pub fn validate_initial(self) -> bool {
        !(self.contains(EntityFlags::MOVABLE) && self.contains(EntityFlags::BUILDING))
    }

    /// Clear the behavior flags zombification revokes and set `ZOMBIE`.
    pub fn zombify(&mut self) {
        self.remove(ZOMBIE_CLEARED);
        self.insert(EntityFlags::ZOMBIE);
    }

    /// Whether this entity currently belongs in the position quadtree
    /// (§3: active ∧ ¬GARRISONED ∧ ¬MARKER; "active" is the caller's job to
    /// check separately via the registry's active set).
    pub fn quadtree_eligible(self) -> bool {
        !self.contains(EntityFlags::GARRISONED) && !self.contains(EntityFlags::MARKER)
    }
}
