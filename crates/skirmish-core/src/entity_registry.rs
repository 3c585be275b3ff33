//! Entity Registry (§4.A): UID lifecycle and the active-set attribute tables.
//!
//! Grounded on `skirmish-ecs`'s `World`/`EntityAllocator` for UID allocation
//! (see the "UID representation" Open Question resolution in `DESIGN.md`)
//! and on `original_source/src/entity.h` for the flag semantics consumed by
//! [`EntityFlags`].
//!
//! Every entity in the active set has a row in each attribute table
//! (flags, faction, position, vision range, selection radius) -- enforced
//! here by always inserting/removing all five components together.

use skirmish_ecs::entity::EntityId;
use skirmish_ecs::flags::EntityFlags;
use skirmish_ecs::world::World;
use thiserror::Error;

use crate::combat::Combatant;
use crate::components::{Faction, Position, SelectionRadius, VisionRange};
use crate::construction::Building;
use crate::fog::FogGrid;
use crate::harvest::Harvester;
use crate::resource::ResourceNode;
use crate::storage::StorageSite;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity already exists in the active set")]
    Duplicate,
    #[error("entity is not in the active set")]
    Absent,
}

/// Entity Registry: owns UID lifecycle and the five foundational attribute
/// tables (implemented as ECS components, not a hand-rolled hash map).
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Entities queued for removal via `defer_remove`, flushed at end of tick.
    pending_removal: Vec<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            pending_removal: Vec::new(),
        }
    }

    /// Allocate a fresh UID without adding it to the active set.
    ///
    /// The returned ID becomes valid for `add` only; no attribute rows exist
    /// for it until `add` is called.
    pub fn new_uid(&self, world: &mut World) -> EntityId {
        world.spawn_bundle(skirmish_ecs::world::ComponentBundle::new())
    }

    /// Add `uid` to the active set with the given initial flags and position.
    ///
    /// `uid` must have been produced by [`new_uid`](Self::new_uid) on this
    /// same world and not yet added. `flags` are validated per §3 (MOVABLE
    /// and BUILDING are mutually exclusive on creation); an invalid
    /// combination is a programming error (`debug_assert!`), not a runtime
    /// `RegistryError`.
    pub fn add(
        &mut self,
        world: &mut World,
        uid: EntityId,
        flags: EntityFlags,
        pos: Position,
    ) -> Result<(), RegistryError> {
        if world.has_component::<EntityFlags>(uid) {
            return Err(RegistryError::Duplicate);
        }
        debug_assert!(
            flags.validate_initial(),
            "MOVABLE and BUILDING are mutually exclusive on creation"
        );

        world.insert_component(uid, flags).ok();
        world.insert_component(uid, pos).ok();
        world.insert_component(uid, Faction(0)).ok();
        world.insert_component(uid, VisionRange(0.0)).ok();
        world.insert_component(uid, SelectionRadius(0.0)).ok();
        Ok(())
    }

    /// Remove `uid` from the active set immediately.
    ///
    /// Per §3's lifecycle, callers should prefer [`defer_remove`](Self::defer_remove)
    /// during normal tick processing; `remove` is for the end-of-tick flush
    /// and for tests.
    pub fn remove(&mut self, world: &mut World, uid: EntityId) -> Result<(), RegistryError> {
        if !world.has_component::<EntityFlags>(uid) {
            return Err(RegistryError::Absent);
        }
        world.despawn(uid).ok();
        Ok(())
    }

    /// Enqueue `uid` for removal at the next [`flush_removed`](Self::flush_removed).
    ///
    /// Idempotent: enqueuing the same UID twice only removes it once.
    pub fn defer_remove(&mut self, uid: EntityId) {
        if !self.pending_removal.contains(&uid) {
            self.pending_removal.push(uid);
        }
    }

    /// Remove every UID queued via [`defer_remove`](Self::defer_remove), in
    /// FIFO enqueue order, then clear the queue.
    ///
    /// Returns the UIDs that were actually removed (a UID despawned some
    /// other way between `defer_remove` and `flush_removed` is skipped, not
    /// an error).
    pub fn flush_removed(&mut self, world: &mut World) -> Vec<EntityId> {
        let queued = std::mem::take(&mut self.pending_removal);
        let mut removed = Vec::with_capacity(queued.len());
        for uid in queued {
            if self.remove(world, uid).is_ok() {
                removed.push(uid);
            }
        }
        removed
    }

    pub fn exists(&self, world: &World, uid: EntityId) -> bool {
        world.has_component::<EntityFlags>(uid)
    }

    pub fn flags_get(&self, world: &World, uid: EntityId) -> EntityFlags {
        *world
            .get_component::<EntityFlags>(uid)
            .expect("flags_get requires an active entity")
    }

    pub fn flags_set(&self, world: &mut World, uid: EntityId, flags: EntityFlags) {
        *world
            .get_component_mut::<EntityFlags>(uid)
            .expect("flags_set requires an active entity") = flags;
    }

    pub fn position_get(&self, world: &World, uid: EntityId) -> Position {
        *world
            .get_component::<Position>(uid)
            .expect("position_get requires an active entity")
    }

    pub fn faction_get(&self, world: &World, uid: EntityId) -> Faction {
        *world
            .get_component::<Faction>(uid)
            .expect("faction_get requires an active entity")
    }

    /// Reassign `uid`'s faction, atomically moving its vision contribution
    /// from the old faction to the new one at its current position, and
    /// notifying every other subsystem table that keys behavior off faction
    /// (per §4.A: "triggers vision, combat ref, storage, building, resource
    /// subsystems to remap faction").
    ///
    /// Per §4.A's invariant, the vision remove and vision add must happen
    /// together so no tick observes `uid` contributing vision to neither (a
    /// flicker) or both (a leak) faction.
    ///
    /// `Combatant`/`Harvester` carry relationships (a target, an in-flight
    /// transport order) that become invalid the instant allegiance changes,
    /// so those are cleared here directly when present. `StorageSite`,
    /// `Building`, and `ResourceNode` carry no per-faction ledger state of
    /// their own in this port -- the original's analogous
    /// `G_{Building,Resource}_UpdateFactionID` only re-keys nav-blocker
    /// refcounts by faction, and this port does not model a navgrid
    /// blocker table (see `construction.rs`'s `found`/`complete` docs) --
    /// so those components are looked up and left untouched on purpose
    /// rather than silently skipped.
    pub fn faction_set(&self, world: &mut World, fog: &mut FogGrid, uid: EntityId, faction: Faction) {
        let old = self.faction_get(world, uid);
        if old == faction {
            return;
        }
        let pos = self.position_get(world, uid);
        let vision = self.vision_range_get(world, uid);
        if vision.0 > 0.0 {
            fog.remove_vision(old.0, pos.xz(), vision.0);
        }
        *world
            .get_component_mut::<Faction>(uid)
            .expect("faction_set requires an active entity") = faction;
        if vision.0 > 0.0 {
            fog.add_vision(faction.0, pos.xz(), vision.0);
        }

        if let Some(combatant) = world.get_component_mut::<Combatant>(uid) {
            combatant.clear_target();
        }
        if let Some(harvester) = world.get_component_mut::<Harvester>(uid) {
            harvester.stop();
        }
        if let Some(storage) = world.get_component_mut::<StorageSite>(uid) {
            storage.on_faction_changed();
        }
        if let Some(building) = world.get_component_mut::<Building>(uid) {
            building.on_faction_changed();
        }
        if let Some(resource) = world.get_component_mut::<ResourceNode>(uid) {
            resource.on_faction_changed();
        }
    }

    pub fn vision_range_get(&self, world: &World, uid: EntityId) -> VisionRange {
        *world
            .get_component::<VisionRange>(uid)
            .expect("vision_range_get requires an active entity")
    }

    /// Change `uid`'s vision range, applying the refcount diff to the fog
    /// grid at its current position and faction.
    pub fn vision_range_set(
        &self,
        world: &mut World,
        fog: &mut FogGrid,
        uid: EntityId,
        range: VisionRange,
    ) {
        let old = self.vision_range_get(world, uid);
        if old.0 == range.0 {
            return;
        }
        let pos = self.position_get(world, uid);
        let faction = self.faction_get(world, uid);
        if old.0 > 0.0 {
            fog.remove_vision(faction.0, pos.xz(), old.0);
        }
        *world
            .get_component_mut::<VisionRange>(uid)
            .expect("vision_range_set requires an active entity") = range;
        if range.0 > 0.0 {
            fog.add_vision(faction.0, pos.xz(), range.0);
        }
    }

    pub fn selection_radius_get(&self, world: &World, uid: EntityId) -> SelectionRadius {
        *world
            .get_component::<SelectionRadius>(uid)
            .expect("selection_radius_get requires an active entity")
    }

    /// Change `uid`'s selection radius. Movement (clearpath neighbour
    /// radius) and resource-blocker (navgrid footprint) subsystems read this
    /// value lazily on their next tick; no immediate notification is needed
    /// because neither maintains its own cached copy.
    pub fn selection_radius_set(&self, world: &mut World, uid: EntityId, radius: SelectionRadius) {
        *world
            .get_component_mut::<SelectionRadius>(uid)
            .expect("selection_radius_set requires an active entity") = radius;
    }

    pub fn active_count(&self, world: &World) -> usize {
        world.entity_count()
    }
}
