//! Integration orchestrator: connects WASM module execution to the ECS
//! tick loop.
//!
//! The [`run_wasm_tick`] function executes a complete tick of WASM gameplay:
//! prepare host state -> execute WASM -> drain commands and events -> apply
//! commands to the world -> hand events back to the caller for dispatch on
//! the engine's event bus.
//!
//! # Causal Chain Preservation
//!
//! Every command emitted by WASM gameplay code carries:
//!
//! - [`SystemId::WASM_GAMEPLAY`] as the issuing system
//! - [`CausalReason::GameRule`] with the reason string provided by the WASM module
//!
//! These flow through [`CommandBuffer::apply`] into the world unchanged --
//! the causality metadata is never lost or rewritten crossing the WASM
//! boundary.
//!
//! [`SystemId::WASM_GAMEPLAY`]: skirmish_ecs::identity::SystemId::WASM_GAMEPLAY
//! [`CausalReason::GameRule`]: skirmish_ecs::command::CausalReason::GameRule
//! [`CommandBuffer::apply`]: skirmish_ecs::command::CommandBuffer::apply

use skirmish_ecs::event::Event;
use skirmish_ecs::world::World;

use crate::module::WasmModule;
use crate::WasmError;

/// Run a full tick with WASM gameplay execution.
///
/// 1. Prepare host state with tick metadata and a world snapshot.
/// 2. Execute the WASM module's `tick()` function.
/// 3. Drain commands and events from WASM host state.
/// 4. Apply commands to the ECS world.
/// 5. Return the scripted events for the caller to dispatch on the event bus.
///
/// # Returns
///
/// A tuple `(applied_command_count, events)`.
///
/// # Errors
///
/// Returns [`WasmError`] if the WASM module's `tick()` function traps or
/// runs out of fuel.
pub fn run_wasm_tick(
    module: &mut WasmModule,
    world: &mut World,
    tick: u64,
    sim_time: f64,
) -> Result<(usize, Vec<Event>), WasmError> {
    module.host_state_mut().begin_tick(tick, sim_time);

    let entity_count = world.entity_count();
    module.host_state_mut().entity_count = entity_count;

    module.call_tick()?;

    let mut cmd_buf = module.drain_commands();
    let events = module.host_state_mut().drain_events();

    let applied = cmd_buf.apply(world);
    let cmd_count = applied.len();

    Ok((cmd_count, events))
}
