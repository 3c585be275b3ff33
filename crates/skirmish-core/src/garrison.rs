//! Garrison (§4.J): per-unit and per-carrier garrison state machines,
//! land/water rendezvous point selection, and staggered eviction.
//!
//! Grounded on `original_source/src/game/garrison.c`'s
//! `enum unit_state` (`STATE_NOT_GARRISONED` .. `STATE_GARRISONED`),
//! `enum holder_state` (`STATE_IDLE`, `STATE_MOVING_TO_PICKUP_POINT`,
//! `STATE_MOVING_TO_DROPOFF_POINT`), and constants `EVICT_DELAY_MS` (1000)
//! / `GARRISON_THRESHOLD_DIST` (25.0). No standalone rendezvous-selection
//! function made it into the retrieval pack alongside `garrison.c`, so
//! `compute_rendezvous` below is this port's own nearest-tile search over
//! caller-supplied candidates, built to match §4.J's prose description
//! rather than ported from unseen logic -- see `DESIGN.md`.

use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;

/// A paired land/water tile a land unit and a water-borne carrier each move
/// to in order to board: the nearest water-adjacent land tile reachable by
/// the unit, and the nearest water tile reachable by the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RendezvousPoint {
    pub land_tile: (f32, f32),
    pub water_tile: (f32, f32),
}

fn dist2(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

fn nearest_tile(from: (f32, f32), candidates: &[(f32, f32)]) -> Option<(f32, f32)> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| dist2(from, *a).partial_cmp(&dist2(from, *b)).unwrap())
}

/// Select a [`RendezvousPoint`] for a land unit at `unit_pos` to board a
/// carrier at `carrier_pos`: the nearest of `land_candidates` to the unit,
/// paired with the nearest of `water_candidates` to the carrier. Callers
/// supply both candidate lists already filtered to tiles reachable by each
/// party (typically sampled from the navgrid/water mask); this module has
/// no terrain or pathing model of its own, mirroring how `movement.rs`'s
/// clearpath solver leaves the navgrid to an external collaborator.
pub fn compute_rendezvous(
    unit_pos: (f32, f32),
    carrier_pos: (f32, f32),
    land_candidates: &[(f32, f32)],
    water_candidates: &[(f32, f32)],
) -> Option<RendezvousPoint> {
    let land_tile = nearest_tile(unit_pos, land_candidates)?;
    let water_tile = nearest_tile(carrier_pos, water_candidates)?;
    Some(RendezvousPoint { land_tile, water_tile })
}

/// Distance (world units) at which a unit is considered close enough to its
/// garrisonable target to board.
pub const GARRISON_THRESHOLD_DIST: f32 = 25.0;
/// Milliseconds between successive evictions from a carrier, so a mass
/// eviction staggers units out one at a time instead of teleport-bursting.
pub const EVICT_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    NotGarrisoned,
    MovingToGarrisonable,
    AwaitingPickup,
    Garrisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolderState {
    Idle,
    MovingToPickupPoint,
    MovingToDropoffPoint,
}

/// Per-unit garrison state (entities with the GARRISON flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarrisonUnit {
    pub state: UnitState,
    pub target: Option<EntityId>,
    pub capacity_consumed: u32,
    /// Set by [`order_board_via_rendezvous`](Self::order_board_via_rendezvous)
    /// for a land-into-water boarding; `None` for a direct land-to-land board.
    pub rendezvous: Option<RendezvousPoint>,
}

impl GarrisonUnit {
    pub fn new(capacity_consumed: u32) -> Self {
        Self {
            state: UnitState::NotGarrisoned,
            target: None,
            capacity_consumed,
            rendezvous: None,
        }
    }

    /// Order this unit to board `carrier`.
    pub fn order_board(&mut self, carrier: EntityId) {
        self.target = Some(carrier);
        self.state = UnitState::MovingToGarrisonable;
        self.rendezvous = None;
    }

    /// Order this unit to board a water-borne `carrier` via `rendezvous`
    /// (§4.J's land-into-water case): the unit navigates to
    /// `rendezvous.land_tile` rather than straight at the carrier's
    /// (possibly unreachable) position.
    pub fn order_board_via_rendezvous(&mut self, carrier: EntityId, rendezvous: RendezvousPoint) {
        self.target = Some(carrier);
        self.state = UnitState::MovingToGarrisonable;
        self.rendezvous = Some(rendezvous);
    }

    /// Called once the unit is within [`GARRISON_THRESHOLD_DIST`] of its
    /// target carrier. `carrier_ready` reflects whether the carrier is
    /// `Idle` (ready to take the unit immediately) or busy (unit must
    /// wait).
    pub fn arrive_at_carrier(&mut self, carrier_ready: bool) {
        debug_assert_eq!(self.state, UnitState::MovingToGarrisonable);
        self.state = if carrier_ready {
            UnitState::Garrisoned
        } else {
            UnitState::AwaitingPickup
        };
    }

    /// The carrier has become idle while this unit awaits pickup.
    pub fn carrier_became_ready(&mut self) {
        if self.state == UnitState::AwaitingPickup {
            self.state = UnitState::MovingToGarrisonable;
        }
    }

    pub fn board_directly(&mut self, carrier: EntityId) {
        self.target = Some(carrier);
        self.state = UnitState::Garrisoned;
    }

    pub fn evict(&mut self) {
        self.state = UnitState::NotGarrisoned;
        self.target = None;
        self.rendezvous = None;
    }

    pub fn cancel(&mut self) {
        self.state = UnitState::NotGarrisoned;
        self.target = None;
        self.rendezvous = None;
    }
}

/// Per-carrier garrison state (entities with the GARRISONABLE flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarrisonCarrier {
    pub state: HolderState,
    pub capacity: u32,
    pub current: u32,
    pub occupants: Vec<EntityId>,
    /// Wall-clock tick timestamp of the most recently issued eviction, so
    /// callers can gate the next one `EVICT_DELAY_MS` later.
    pub last_evict_tick: Option<u64>,
    /// The water tile this carrier last rendezvoused at, so it can return
    /// there (§8 scenario: "after one unit evicts, the carrier returns to
    /// the rendezvous") to pick up units still `AwaitingPickup`.
    pub rendezvous_water_tile: Option<(f32, f32)>,
}

impl GarrisonCarrier {
    pub fn new(capacity: u32) -> Self {
        Self {
            state: HolderState::Idle,
            capacity,
            current: 0,
            occupants: Vec::new(),
            last_evict_tick: None,
            rendezvous_water_tile: None,
        }
    }

    /// Record the water tile of a rendezvous this carrier is honoring, so a
    /// later eviction knows where to return to.
    pub fn set_rendezvous(&mut self, water_tile: (f32, f32)) {
        self.rendezvous_water_tile = Some(water_tile);
    }

    /// After evicting while units remain `AwaitingPickup` at a rendezvous,
    /// send the carrier back to pick up the rest.
    pub fn begin_return_to_rendezvous(&mut self) -> Option<(f32, f32)> {
        let tile = self.rendezvous_water_tile?;
        self.state = HolderState::MovingToPickupPoint;
        Some(tile)
    }

    pub fn has_room(&self, consumed: u32) -> bool {
        self.current + consumed <= self.capacity
    }

    /// Board `unit` consuming `consumed` capacity. Returns `false` if there
    /// is no room.
    pub fn board(&mut self, unit: EntityId, consumed: u32) -> bool {
        if !self.has_room(consumed) {
            return false;
        }
        self.occupants.push(unit);
        self.current += consumed;
        true
    }

    /// Evict the next occupant in boarding order (FIFO), if the minimum
    /// delay has elapsed since the last eviction. `now_ms` is the caller's
    /// wall-clock time.
    pub fn evict_next(&mut self, now_ms: u64, consumed_of: impl Fn(EntityId) -> u32) -> Option<EntityId> {
        if self.occupants.is_empty() {
            return None;
        }
        if let Some(last) = self.last_evict_tick {
            if now_ms.saturating_sub(last) < EVICT_DELAY_MS {
                return None;
            }
        }
        let unit = self.occupants.remove(0);
        self.current = self.current.saturating_sub(consumed_of(unit));
        self.last_evict_tick = Some(now_ms);
        Some(unit)
    }

    pub fn evict_all_immediately(&mut self) -> Vec<EntityId> {
        self.current = 0;
        std::mem::take(&mut self.occupants)
    }
}
