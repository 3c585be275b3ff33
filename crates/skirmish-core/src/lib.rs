//! Skirmish Engine -- Game engine core with deterministic tick loop and command buffer.
//!
//! This crate builds on [`skirmish_ecs`] to provide the simulation driver: a
//! fixed-timestep tick loop that runs systems in a deterministic order, applies
//! commands via the [`CommandBuffer`](skirmish_ecs::command::CommandBuffer), and
//! advances simulation time.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_core::prelude::*;
//!
//! let mut world = World::new();
//! world.register_component::<u32>("score");
//!
//! let config = TickConfig { fixed_dt: 1.0 / 60.0 };
//! let mut tick_loop = TickLoop::new(world, config);
//!
//! tick_loop.add_system("example", |_world, _cmds| {
//!     // game logic here
//! });
//!
//! tick_loop.run_ticks(100);
//! assert_eq!(tick_loop.tick_count(), 100);
//! ```

#![deny(unsafe_code)]

pub mod automation;
pub mod combat;
pub mod components;
pub mod construction;
pub mod entity_registry;
pub mod event_bus;
pub mod fog;
pub mod garrison;
pub mod harvest;
pub mod movement;
pub mod position_index;
pub mod quadtree;
pub mod region;
pub mod render;
pub mod replay;
pub mod resource;
pub mod save;
pub mod snapshot;
pub mod storage;
pub mod systems;
pub mod tick;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use skirmish_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use skirmish_ecs::prelude::*;

    // Engine-specific exports.
    pub use crate::automation::{AutomationState, WorkerState};
    pub use crate::combat::{Combatant, CombatState, Stance as CombatStance};
    pub use crate::components::{Faction, FactionTable, Position, SelectionRadius, Stance, VisionRange};
    pub use crate::construction::{Building, BuildingState, InvalidTransition};
    pub use crate::entity_registry::{EntityRegistry, RegistryError};
    pub use crate::event_bus::{EventBus, Handler};
    pub use crate::fog::FogGrid;
    pub use crate::garrison::{GarrisonCarrier, GarrisonUnit, HolderState, UnitState};
    pub use crate::harvest::{Harvester, HarvesterState, HarvestError, TransportStrategy};
    pub use crate::movement::{Movement, MovementSignal, MovementState};
    pub use crate::position_index::PositionIndex;
    pub use crate::region::{Region, RegionEvent, RegionTable, Shape};
    pub use crate::render::{Aabb, Frustum, Plane, RenderCandidate, RenderKind, RenderWorkspace};
    pub use crate::replay::{replay, ReplayLog, ReplayRecorder, ReplayResult};
    pub use crate::resource::{AmountChangeResult as ResourceAmountChangeResult, ResourceNode};
    pub use crate::save::{SaveError, SaveSections};
    pub use crate::snapshot::EngineSnapshot;
    pub use crate::storage::{SetCurrResult, StorageSite};
    pub use crate::systems::{Simulation, DEFAULT_BUILD_SPEED};
    pub use crate::tick::{SystemFn, TickConfig, TickLoop};
}
