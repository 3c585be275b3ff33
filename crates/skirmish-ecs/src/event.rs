//! Event vocabulary shared between the simulation core and the scripting
//! sandbox: typed event kinds, simulation-state masks, and the event
//! envelope itself.
//!
//! The event *bus* (registration, deferred queue, dispatch ordering) lives in
//! `skirmish-core::event_bus` -- it depends on both this crate and
//! `skirmish-script`, so the vocabulary both sides need to agree on lives
//! here instead, one layer down.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// A typed event kind, partitioned into ranges by origin.
///
/// | Range             | Use                      |
/// |-------------------|--------------------------|
/// | `0x0..0xFFFF`      | system-input events      |
/// | `0x10000..0x1FFFF` | engine-generated events  |
/// | `0x20000..0x2FFFF` | script-generated events  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKind(pub u32);

impl EventKind {
    pub const SYSTEM_INPUT_START: u32 = 0x0;
    pub const ENGINE_START: u32 = 0x10000;
    pub const SCRIPT_START: u32 = 0x20000;

    /// A scripted event kind one past `SCRIPT_START`, offset by `n`. Used by
    /// gameplay modules that need event kinds the engine doesn't predefine.
    pub const fn scripted(n: u32) -> Self {
        EventKind(Self::SCRIPT_START + n)
    }

    pub fn is_system_input(self) -> bool {
        self.0 < Self::ENGINE_START
    }

    pub fn is_engine(self) -> bool {
        (Self::ENGINE_START..Self::SCRIPT_START).contains(&self.0)
    }

    pub fn is_script(self) -> bool {
        self.0 >= Self::SCRIPT_START
    }
}

macro_rules! engine_events {
    ($($name:ident = $offset:expr),+ $(,)?) => {
        impl EventKind {
            $(pub const $name: EventKind = EventKind(EventKind::ENGINE_START + $offset);)+
        }
    };
}

engine_events! {
    UPDATE_START = 0,
    UPDATE_END = 1,
    UPDATE_UI = 2,
    RENDER_3D_PRE = 3,
    RENDER_3D_POST = 4,
    RENDER_UI = 5,
    TICK_60HZ = 6,
    TICK_30HZ = 7,
    TICK_20HZ = 8,
    TICK_15HZ = 9,
    TICK_10HZ = 10,
    TICK_1HZ = 11,
    MOTION_START = 12,
    MOTION_END = 13,
    ANIM_CYCLE_FINISHED = 14,
    ATTACK_START = 15,
    ATTACK_END = 16,
    ENTITY_DEATH = 17,
    ENTITY_DIED = 18,
    ENTITY_STOP = 19,
    BUILD_BEGIN = 20,
    BUILD_END = 21,
    BUILDING_FOUNDED = 22,
    BUILDING_COMPLETED = 23,
    BUILDING_PLACED = 24,
    BUILDING_REMOVED = 25,
    HARVEST_BEGIN = 26,
    HARVEST_END = 27,
    HARVEST_TARGET_ACQUIRED = 28,
    STORAGE_TARGET_ACQUIRED = 29,
    RESOURCE_DROPPED_OFF = 30,
    RESOURCE_PICKED_UP = 31,
    RESOURCE_EXHAUSTED = 32,
    RESOURCE_AMOUNT_CHANGED = 33,
    STORAGE_SITE_AMOUNT_CHANGED = 34,
    ORDER_ISSUED = 35,
    UNIT_BECAME_IDLE = 36,
    UNIT_BECAME_ACTIVE = 37,
    ENTERED_REGION = 38,
    EXITED_REGION = 39,
    RALLY_POINT_SET = 40,
    GAME_SIMSTATE_CHANGED = 41,
    NEW_GAME = 42,
    SESSION_LOADED = 43,
    SESSION_POPPED = 44,
    SESSION_FAIL_LOAD = 45,
}

// ---------------------------------------------------------------------------
// EventSource
// ---------------------------------------------------------------------------

/// Who raised an event: the engine itself, or a scripted gameplay module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Engine,
    Script,
}

// ---------------------------------------------------------------------------
// Simstate
// ---------------------------------------------------------------------------

bitflags! {
    /// Simulation-state mask a handler subscribes with; a handler fires only
    /// if the bus's *current* simstate is in its mask (checked at dispatch
    /// time, not at enqueue time).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SimstateMask: u8 {
        const RUNNING           = 1 << 0;
        const PAUSED_UI_RUNNING = 1 << 1;
        const PAUSED_FULL       = 1 << 2;
    }
}

impl SimstateMask {
    pub const ALL_STATES: SimstateMask = SimstateMask::RUNNING
        .union(SimstateMask::PAUSED_UI_RUNNING)
        .union(SimstateMask::PAUSED_FULL);
}

/// The simulation's current run state (§4.D Tick Scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Simstate {
    Running,
    PausedUiRunning,
    PausedFull,
}

impl Simstate {
    /// The mask bit corresponding to this state, for matching against a
    /// handler's subscribed `SimstateMask`.
    pub fn mask_bit(self) -> SimstateMask {
        match self {
            Simstate::Running => SimstateMask::RUNNING,
            Simstate::PausedUiRunning => SimstateMask::PAUSED_UI_RUNNING,
            Simstate::PausedFull => SimstateMask::PAUSED_FULL,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A single event: `(kind, payload, source)` (§3 DATA MODEL).
///
/// The payload is a JSON value so that native and scripted handlers alike
/// can consume it without a shared Rust type -- native handlers typically
/// downcast/deserialize it into a concrete payload struct immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub source: EventSource,
}

impl Event {
    pub fn engine(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            source: EventSource::Engine,
        }
    }

    pub fn scripted(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            source: EventSource::Script,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_ranges() {
        assert!(EventKind(0).is_system_input());
        assert!(EventKind::UPDATE_START.is_engine());
        assert!(!EventKind::UPDATE_START.is_system_input());
        assert!(EventKind::scripted(5).is_script());
    }

    #[test]
    fn simstate_mask_bit_roundtrip() {
        assert_eq!(Simstate::Running.mask_bit(), SimstateMask::RUNNING);
        assert!(SimstateMask::ALL_STATES.contains(Simstate::PausedFull.mask_bit()));
    }
}
