//! Shared per-entity component types used across subsystems.
//!
//! These are the attribute tables referenced throughout the DATA MODEL:
//! every entity in the active set has a row in each of these tables. They
//! are plain ECS components on [`skirmish_ecs::world::World`] rather than
//! hand-rolled `HashMap<EntityId, T>` tables (see `DESIGN.md`).

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use skirmish_ecs::flags::EntityFlags;

/// World-space position of an entity.
///
/// The Y coordinate is derived from the map height field by an external
/// collaborator; the core only reads/writes it verbatim. The Position Index
/// (`position_index.rs`) indexes the (x, z) plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec3);

impl Position {
    pub fn xz(&self) -> (f32, f32) {
        (self.0.x, self.0.z)
    }
}

/// Index of the faction an entity belongs to, `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction(pub u8);

/// Maximum number of factions a `FactionTable` can hold.
pub const MAX_FACTIONS: usize = 16;

/// Diplomatic stance between two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Peace,
    War,
}

/// Faction registry: names, colors, player-controlled flags, and a symmetric
/// diplomacy matrix.
///
/// Grounded on the DATA MODEL's "Faction" paragraph (§3): up to 16 factions,
/// diagonal of the diplomacy matrix is undefined (a faction's stance toward
/// itself is meaningless and never queried).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionTable {
    slots: Vec<Option<FactionInfo>>,
    /// `diplomacy[i][j]` is only meaningful when both `i` and `j` are
    /// occupied slots and `i != j`.
    diplomacy: Vec<Vec<Stance>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FactionInfo {
    name: String,
    color_rgb: (u8, u8, u8),
    player_controlled: bool,
}

impl FactionTable {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_FACTIONS).map(|_| None).collect(),
            diplomacy: vec![vec![Stance::Peace; MAX_FACTIONS]; MAX_FACTIONS],
        }
    }

    /// Register a faction at the first free slot. Returns `None` if all 16
    /// slots are occupied.
    pub fn add(&mut self, name: &str, color_rgb: (u8, u8, u8), player_controlled: bool) -> Option<u8> {
        let idx = self.slots.iter().position(|s| s.is_none())?;
        self.slots[idx] = Some(FactionInfo {
            name: name.to_owned(),
            color_rgb,
            player_controlled,
        });
        Some(idx as u8)
    }

    /// Remove a faction. Callers must zombify all of its entities
    /// themselves (`entity_registry.rs` does this as part of `remove_faction`).
    pub fn remove(&mut self, faction: u8) {
        if let Some(slot) = self.slots.get_mut(faction as usize) {
            *slot = None;
        }
    }

    pub fn exists(&self, faction: u8) -> bool {
        self.slots
            .get(faction as usize)
            .is_some_and(|s| s.is_some())
    }

    pub fn is_player_controlled(&self, faction: u8) -> bool {
        self.slots
            .get(faction as usize)
            .and_then(|s| s.as_ref())
            .is_some_and(|f| f.player_controlled)
    }

    pub fn player_controlled_factions(&self) -> Vec<u8> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().filter(|f| f.player_controlled).map(|_| i as u8))
            .collect()
    }

    /// Set the stance between `a` and `b`. Symmetric: also sets `b` -> `a`.
    pub fn set_stance(&mut self, a: u8, b: u8, stance: Stance) {
        debug_assert_ne!(a, b, "diplomacy diagonal is undefined");
        self.diplomacy[a as usize][b as usize] = stance;
        self.diplomacy[b as usize][a as usize] = stance;
    }

    pub fn stance(&self, a: u8, b: u8) -> Stance {
        debug_assert_ne!(a, b, "diplomacy diagonal is undefined");
        self.diplomacy[a as usize][b as usize]
    }

    pub fn are_at_war(&self, a: u8, b: u8) -> bool {
        a != b && matches!(self.stance(a, b), Stance::War)
    }
}

impl Default for FactionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Maximum distance at which an entity projects vision (fed into the fog
/// refcount grid by `fog.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionRange(pub f32);

/// Radius used for movement collision-avoidance and as a resource/building
/// navgrid blocker footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRadius(pub f32);

/// Register all shared component types on a freshly created world.
///
/// Every subsystem module calls into this during engine bootstrap rather
/// than registering its own copy of these foundational tables.
pub fn register_shared_components(world: &mut skirmish_ecs::world::World) {
    world.register_component::<Position>("position");
    world.register_component::<Faction>("faction");
    world.register_component::<VisionRange>("vision_range");
    world.register_component::<SelectionRadius>("selection_radius");
    world.register_component::<EntityFlags>("flags");
}
