//! Save/Restore (§4.O): a tagged attribute stream, complementing rather
//! than replacing [`crate::snapshot::EngineSnapshot`]'s BLAKE3-hashed
//! whole-world capture.
//!
//! Where `EngineSnapshot` captures the entire ECS world as one opaque
//! JSON-then-hashed blob for determinism testing, this module writes an
//! ordered, self-describing record stream -- scheduler state, factions,
//! diplomacy, camera, selection, then a `count`-prefixed section per
//! gameplay component -- meant for loading into a world that may already
//! have entities in it (an external scripting loader having restored UIDs
//! first), which `EngineSnapshot::restore` does not support (it replaces
//! the world wholesale). Each record is framed as a little-endian `u32`
//! byte length followed by its `serde_json` encoding, the same
//! serialize-then-hash approach `crate::snapshot` already uses, just
//! length-prefixed so records can be read one at a time instead of parsed
//! as a single document. No single original-source file documents this
//! stream (the original spreads it across many component-specific
//! `*_save`/`*_load` functions), so the section ordering and yield
//! behavior are this port's own synthesis of that pattern.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;
use thiserror::Error;

use crate::automation::AutomationState;
use crate::combat::Combatant;
use crate::construction::Building;
use crate::harvest::Harvester;
use crate::movement::Movement;
use crate::resource::ResourceNode;
use crate::storage::StorageSite;

/// Record count after which the loader invokes the caller's yield hook,
/// giving the scheduler a chance to service other work mid-load.
pub const YIELD_BATCH: usize = 256;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write one length-prefixed JSON-encoded record.
fn write_record<T: Serialize>(w: &mut impl Write, value: &T) -> Result<(), SaveError> {
    let bytes = serde_json::to_vec(value)?;
    w.write_all(&(bytes.len() as u32).to_le_bytes())?;
    w.write_all(&bytes)?;
    Ok(())
}

/// Read one length-prefixed JSON-encoded record.
fn read_record<T: for<'de> Deserialize<'de>>(r: &mut impl Read) -> Result<T, SaveError> {
    let mut len_bytes = [0u8; 4];
    r.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerState {
    pub tick_counter: u64,
    pub wall_tick_counter: u64,
    pub fixed_dt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraState {
    pub pos: (f32, f32, f32),
    pub pitch: f32,
    pub yaw: f32,
    pub speed: f32,
}

/// One gameplay-component section: `count` followed by `(EntityId, T)`
/// pairs in insertion order.
fn write_section<T: Serialize>(w: &mut impl Write, records: &[(EntityId, T)]) -> Result<(), SaveError> {
    write_record(w, &(records.len() as u64))?;
    for (uid, record) in records {
        write_record(w, uid)?;
        write_record(w, record)?;
    }
    Ok(())
}

/// Read a `count`-prefixed section, invoking `on_yield` every
/// [`YIELD_BATCH`] records so a caller embedding this in a cooperative
/// scheduler can service other work between batches.
fn read_section<T: for<'de> Deserialize<'de>>(
    r: &mut impl Read,
    mut on_yield: impl FnMut(),
) -> Result<Vec<(EntityId, T)>, SaveError> {
    let count: u64 = read_record(r)?;
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let uid: EntityId = read_record(r)?;
        let record: T = read_record(r)?;
        out.push((uid, record));
        if (i + 1) as usize % YIELD_BATCH == 0 {
            on_yield();
        }
    }
    Ok(out)
}

/// The full ordered section set for one save. Sections whose component the
/// saved world does not use may be empty.
#[derive(Debug, Clone, Default)]
pub struct SaveSections {
    pub scheduler: Option<SchedulerState>,
    pub factions: Vec<(u8, String)>,
    /// Symmetric diplomacy pairs (a, b) currently at war.
    pub diplomacy_war: Vec<(u8, u8)>,
    pub camera: Option<CameraState>,
    pub selection: Vec<EntityId>,
    pub movement: Vec<(EntityId, Movement)>,
    pub combat: Vec<(EntityId, Combatant)>,
    pub building: Vec<(EntityId, Building)>,
    pub storage: Vec<(EntityId, StorageSite)>,
    pub harvester: Vec<(EntityId, Harvester)>,
    pub automation: Vec<(EntityId, AutomationState)>,
    pub resource: Vec<(EntityId, ResourceNode)>,
}

/// Write every section of `sections` to `w` in the fixed order: scheduler,
/// factions, diplomacy, camera, selection, then per-component sections.
pub fn write_stream(w: &mut impl Write, sections: &SaveSections) -> Result<(), SaveError> {
    write_record(w, &sections.scheduler)?;
    write_record(w, &sections.factions)?;
    write_record(w, &sections.diplomacy_war)?;
    write_record(w, &sections.camera)?;
    write_record(w, &sections.selection)?;
    write_section(w, &sections.movement)?;
    write_section(w, &sections.combat)?;
    write_section(w, &sections.building)?;
    write_section(w, &sections.storage)?;
    write_section(w, &sections.harvester)?;
    write_section(w, &sections.automation)?;
    write_section(w, &sections.resource)?;
    Ok(())
}

/// Read a stream written by [`write_stream`]. `on_yield` is invoked every
/// [`YIELD_BATCH`] records across every per-component section, modeling the
/// cooperative yield points the loader must give the scheduler between
/// large loops. The caller is responsible for merging the returned
/// sections into a world that may already hold a pre-populated active set
/// (this function never assumes the destination world starts empty).
pub fn read_stream(r: &mut impl Read, mut on_yield: impl FnMut()) -> Result<SaveSections, SaveError> {
    let scheduler: Option<SchedulerState> = read_record(r)?;
    let factions: Vec<(u8, String)> = read_record(r)?;
    let diplomacy_war: Vec<(u8, u8)> = read_record(r)?;
    let camera: Option<CameraState> = read_record(r)?;
    let selection: Vec<EntityId> = read_record(r)?;
    let movement = read_section(r, &mut on_yield)?;
    let combat = read_section(r, &mut on_yield)?;
    let building = read_section(r, &mut on_yield)?;
    let storage = read_section(r, &mut on_yield)?;
    let harvester = read_section(r, &mut on_yield)?;
    let automation = read_section(r, &mut on_yield)?;
    let resource = read_section(r, &mut on_yield)?;
    Ok(SaveSections {
        scheduler,
        factions,
        diplomacy_war,
        camera,
        selection,
        movement,
        combat,
        building,
        storage,
        harvester,
        automation,
        resource,
    })
}
