//! Automation (§4.M): per-entity idle/active hysteresis and automatic
//! transport-harvester assignment.
//!
//! Grounded on `original_source/src/game/automation.c`'s `enum
//! worker_state` (`STATE_IDLE`, `STATE_WAKING`, `STATE_ACTIVE`,
//! `STATE_STOPPING`), `TRANSIENT_STATE_TICKS` (2), and
//! `TRANSPORT_UNIT_COST_DISTANCE` (150) used by the assignment cost
//! function.

use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;

/// Ticks a transient state (`Waking`/`Stopping`) must hold before resolving
/// to `Active`/`Idle`, preventing UI flicker on brief idle gaps between
/// orders.
pub const TRANSIENT_STATE_TICKS: u32 = 2;
/// Distance unit the automatic-transport cost function divides by.
pub const TRANSPORT_UNIT_COST_DISTANCE: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    Waking,
    Active,
    Stopping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationState {
    pub state: WorkerState,
    transient_ticks: u32,
}

impl Default for AutomationState {
    fn default() -> Self {
        Self {
            state: WorkerState::Idle,
            transient_ticks: 0,
        }
    }
}

impl AutomationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick given whether the entity currently satisfies the
    /// "idle" predicate (not garrisoned, still if movable, harvester-idle
    /// if a harvester, builder-idle if a builder, combat-idle if
    /// combatable -- computed by the caller, which is why it is passed in
    /// rather than derived here).
    pub fn tick(&mut self, currently_idle: bool) {
        match self.state {
            WorkerState::Idle => {
                if !currently_idle {
                    self.state = WorkerState::Waking;
                    self.transient_ticks = 0;
                }
            }
            WorkerState::Waking => {
                if currently_idle {
                    self.state = WorkerState::Idle;
                    self.transient_ticks = 0;
                    return;
                }
                self.transient_ticks += 1;
                if self.transient_ticks >= TRANSIENT_STATE_TICKS {
                    self.state = WorkerState::Active;
                    self.transient_ticks = 0;
                }
            }
            WorkerState::Active => {
                if currently_idle {
                    self.state = WorkerState::Stopping;
                    self.transient_ticks = 0;
                }
            }
            WorkerState::Stopping => {
                if !currently_idle {
                    self.state = WorkerState::Active;
                    self.transient_ticks = 0;
                    return;
                }
                self.transient_ticks += 1;
                if self.transient_ticks >= TRANSIENT_STATE_TICKS {
                    self.state = WorkerState::Idle;
                    self.transient_ticks = 0;
                }
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkerState::Idle
    }
}

/// Cost of assigning an idle automatic harvester to `site`, used to pick
/// the minimum-cost site (tie-broken by `num_assigned` then `distance`).
pub fn transport_cost(distance: f32, num_assigned: u32) -> u32 {
    (distance / TRANSPORT_UNIT_COST_DISTANCE).floor() as u32 + num_assigned
}

/// Pick the minimum-cost storage site among `candidates` (site, distance,
/// num_assigned already assigned to it), tie-broken by `(num_assigned,
/// distance)`.
pub fn pick_assignment(candidates: &[(EntityId, f32, u32)]) -> Option<EntityId> {
    candidates
        .iter()
        .map(|&(uid, dist, assigned)| (transport_cost(dist, assigned), assigned, dist, uid))
        .min_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.partial_cmp(&b.2).unwrap())
        })
        .map(|(_, _, _, uid)| uid)
}
