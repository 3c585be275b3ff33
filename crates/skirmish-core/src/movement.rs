//! Movement (§4.E): the per-entity motion state machine and the
//! clearpath-style collision-avoidance velocity solver.
//!
//! The state machine and its order/cancellation semantics are original to
//! this module (§4.E). The velocity solver is grounded on
//! `original_source/src/game/clearpath.h`'s public contract:
//! `G_ClearPath_NewVelocity(ent, ent_uid, ent_des_v, dyn_neighbs,
//! stat_neighbs, save_debug)` takes a desired velocity plus dynamic and
//! static neighbor circles (`struct cp_ent{xz_pos, xz_vel, radius}`) and
//! returns an adjusted velocity; `CLEARPATH_NEIGHBOUR_RADIUS` (10.0) bounds
//! which neighbors are considered, `CLEARPATH_BUFFER_RADIUS` (0.0, added to
//! the entity's own radius for wider turns) is the only other documented
//! tuning constant. The original's `clearpath.c` (a velocity-obstacle/ORCA
//! solver) is not in the retrieval pack, so the avoidance step here is a
//! simplified sampling-based solver against that same contract rather than
//! a line-for-line port -- see `DESIGN.md`.

use glam::{Quat, Vec2};
use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;

/// Neighbors farther than this are ignored by the avoidance solver.
pub const CLEARPATH_NEIGHBOUR_RADIUS: f32 = 10.0;
/// Added to an entity's own radius so it takes wider turns around
/// obstacles, leaving a buffer.
pub const CLEARPATH_BUFFER_RADIUS: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementState {
    Idle,
    MovingToPoint { dest: (f32, f32) },
    MovingToSurround { target: EntityId },
    MovingToEnterRange { target: EntityId, range: f32 },
    SeekingEnemies,
    TurningTo { orientation: Quat },
}

/// Per-entity movement state plus the tick-rate it runs avoidance at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub state: MovementState,
    /// Collision-avoidance tick rate in Hz: one of {20, 10, 5, 1}.
    pub tick_rate_hz: u32,
    /// `true` between a `MOTION_START` and its matching `MOTION_END` for
    /// the current movement episode.
    motion_active: bool,
    /// Set by [`Movement::block_at`]: this entity currently occupies a
    /// navgrid cell as a static obstacle (e.g. holding position as a
    /// blocker) rather than being free to receive avoidance velocity.
    blocked_at: Option<(f32, f32)>,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            state: MovementState::Idle,
            tick_rate_hz: 20,
            motion_active: false,
            blocked_at: None,
        }
    }
}

/// Emitted by state-mutating calls so the caller can dispatch the
/// corresponding engine events (`MOTION_START`/`MOTION_END`/`ORDER_ISSUED`)
/// without this module depending on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSignal {
    OrderIssued,
    MotionStart,
    MotionEnd,
}

impl Movement {
    pub fn new(tick_rate_hz: u32) -> Self {
        debug_assert!(
            matches!(tick_rate_hz, 20 | 10 | 5 | 1),
            "movement tick rate must be one of {{20, 10, 5, 1}}, got {tick_rate_hz}"
        );
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    fn begin_order(&mut self, state: MovementState) -> Vec<MovementSignal> {
        let mut signals = vec![MovementSignal::OrderIssued];
        if !self.motion_active {
            self.motion_active = true;
            signals.push(MovementSignal::MotionStart);
        }
        self.state = state;
        signals
    }

    pub fn set_dest(&mut self, dest: (f32, f32)) -> Vec<MovementSignal> {
        self.begin_order(MovementState::MovingToPoint { dest })
    }

    pub fn set_surround_entity(&mut self, target: EntityId) -> Vec<MovementSignal> {
        self.begin_order(MovementState::MovingToSurround { target })
    }

    pub fn set_enter_range(&mut self, target: EntityId, range: f32) -> Vec<MovementSignal> {
        self.begin_order(MovementState::MovingToEnterRange { target, range })
    }

    pub fn set_seek_enemies(&mut self) -> Vec<MovementSignal> {
        self.begin_order(MovementState::SeekingEnemies)
    }

    pub fn turn_to(&mut self, orientation: Quat) -> Vec<MovementSignal> {
        self.begin_order(MovementState::TurningTo { orientation })
    }

    /// Stop all motion. Idempotent: calling `stop` on an already-idle
    /// entity emits nothing.
    pub fn stop(&mut self) -> Vec<MovementSignal> {
        if matches!(self.state, MovementState::Idle) && !self.motion_active {
            return Vec::new();
        }
        self.state = MovementState::Idle;
        let mut signals = Vec::new();
        if self.motion_active {
            self.motion_active = false;
            signals.push(MovementSignal::MotionEnd);
        }
        signals
    }

    /// Navigation reports the destination reached; ends the motion episode
    /// without an explicit `stop` call.
    pub fn arrive(&mut self) -> Vec<MovementSignal> {
        self.state = MovementState::Idle;
        if self.motion_active {
            self.motion_active = false;
            vec![MovementSignal::MotionEnd]
        } else {
            Vec::new()
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, MovementState::Idle)
    }

    pub fn is_moving(&self) -> bool {
        self.motion_active
    }

    /// Stop and register this entity as a static navgrid blocker at
    /// `pos`. The caller is responsible for the actual navgrid blocker
    /// increment (an external collaborator, §1); this just tracks the
    /// local state so `unblock` can undo it symmetrically.
    pub fn block_at(&mut self, pos: (f32, f32)) -> Vec<MovementSignal> {
        let signals = self.stop();
        self.blocked_at = Some(pos);
        signals
    }

    /// Clear a prior [`Movement::block_at`]. Idempotent.
    pub fn unblock(&mut self) {
        self.blocked_at = None;
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Clearpath-style avoidance solver
// ---------------------------------------------------------------------------

/// A neighbor circle for the avoidance solver: position, current velocity
/// (zero for static obstacles), and collision radius.
#[derive(Debug, Clone, Copy)]
pub struct ClearpathEntity {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

const CANDIDATE_ANGLES_DEG: [f32; 9] = [0.0, 15.0, -15.0, 30.0, -30.0, 45.0, -45.0, 90.0, -90.0];
const TIME_HORIZON: f32 = 2.0;

/// Compute a collision-adjusted velocity for an entity with `self_radius`
/// at `self_pos`, given its desired velocity and nearby dynamic/static
/// neighbors (already position/radius filtered by the caller if desired --
/// this function additionally ignores anything past
/// [`CLEARPATH_NEIGHBOUR_RADIUS`]).
///
/// Samples candidate headings near the desired direction (closest-first)
/// and picks the first that does not put `self` on a collision course with
/// any neighbor within [`TIME_HORIZON`] seconds, falling back to slowing
/// down along the desired heading if every sampled heading collides.
pub fn clearpath_new_velocity(
    self_pos: Vec2,
    self_radius: f32,
    desired_vel: Vec2,
    dynamic_neighbors: &[ClearpathEntity],
    static_neighbors: &[ClearpathEntity],
) -> Vec2 {
    let effective_radius = self_radius + CLEARPATH_BUFFER_RADIUS;
    let neighbors: Vec<ClearpathEntity> = dynamic_neighbors
        .iter()
        .chain(static_neighbors.iter())
        .copied()
        .filter(|n| self_pos.distance(n.pos) <= CLEARPATH_NEIGHBOUR_RADIUS)
        .collect();

    if neighbors.is_empty() || desired_vel.length_squared() < f32::EPSILON {
        return desired_vel;
    }

    let speed = desired_vel.length();
    let desired_dir = desired_vel / speed;

    for &angle_deg in &CANDIDATE_ANGLES_DEG {
        let candidate = rotate(desired_dir, angle_deg.to_radians()) * speed;
        if !collides(self_pos, effective_radius, candidate, &neighbors) {
            return candidate;
        }
    }

    // Every sampled heading collides within the time horizon: slow down
    // along the original heading rather than stopping dead.
    desired_vel * 0.25
}

fn rotate(v: Vec2, radians: f32) -> Vec2 {
    let (sin, cos) = radians.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

fn collides(self_pos: Vec2, self_radius: f32, self_vel: Vec2, neighbors: &[ClearpathEntity]) -> bool {
    neighbors.iter().any(|n| {
        let rel_pos = n.pos - self_pos;
        let rel_vel = self_vel - n.vel;
        let combined_radius = self_radius + n.radius;

        if rel_pos.length() <= combined_radius {
            return true; // already overlapping
        }
        if rel_vel.length_squared() < f32::EPSILON {
            return false; // not closing in
        }

        // Time of closest approach, clamped to the horizon.
        let t = (-rel_pos.dot(rel_vel) / rel_vel.length_squared()).clamp(0.0, TIME_HORIZON);
        let closest = rel_pos + rel_vel * t;
        closest.length() < combined_radius
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(i: u32) -> EntityId {
        EntityId::new(i, 0)
    }

    #[test]
    fn set_dest_emits_order_issued_and_motion_start() {
        let mut m = Movement::new(20);
        let signals = m.set_dest((10.0, 10.0));
        assert_eq!(signals, vec![MovementSignal::OrderIssued, MovementSignal::MotionStart]);
        assert!(m.is_moving());
    }

    #[test]
    fn reissuing_an_order_while_moving_does_not_restart_motion() {
        let mut m = Movement::new(20);
        m.set_dest((10.0, 10.0));
        let signals = m.set_surround_entity(eid(1));
        assert_eq!(signals, vec![MovementSignal::OrderIssued], "already in motion, no second MOTION_START");
    }

    #[test]
    fn stop_is_idempotent() {
        let mut m = Movement::new(20);
        assert!(m.stop().is_empty(), "stopping an already-idle unit emits nothing");
        m.set_dest((1.0, 1.0));
        let signals = m.stop();
        assert_eq!(signals, vec![MovementSignal::MotionEnd]);
        assert!(m.stop().is_empty());
    }

    #[test]
    fn motion_start_precedes_motion_end_for_one_episode() {
        let mut m = Movement::new(20);
        let start_signals = m.set_dest((5.0, 5.0));
        assert!(start_signals.contains(&MovementSignal::MotionStart));
        let end_signals = m.arrive();
        assert_eq!(end_signals, vec![MovementSignal::MotionEnd]);
    }

    #[test]
    fn clearpath_passes_through_desired_velocity_with_no_neighbors() {
        let v = clearpath_new_velocity(Vec2::ZERO, 1.0, Vec2::new(1.0, 0.0), &[], &[]);
        assert_eq!(v, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn clearpath_deflects_around_a_static_obstacle_dead_ahead() {
        let obstacle = ClearpathEntity {
            pos: Vec2::new(2.0, 0.0),
            vel: Vec2::ZERO,
            radius: 1.0,
        };
        let v = clearpath_new_velocity(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), &[], &[obstacle]);
        assert!(!collides(Vec2::ZERO, 1.0, v, &[obstacle]), "solver must find a non-colliding heading");
    }

    #[test]
    fn clearpath_ignores_neighbors_outside_the_radius() {
        let far = ClearpathEntity {
            pos: Vec2::new(100.0, 0.0),
            vel: Vec2::ZERO,
            radius: 1.0,
        };
        let v = clearpath_new_velocity(Vec2::ZERO, 1.0, Vec2::new(1.0, 0.0), &[], &[far]);
        assert_eq!(v, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn block_at_stops_motion_and_marks_blocked() {
        let mut m = Movement::new(20);
        m.set_dest((10.0, 10.0));
        let signals = m.block_at((1.0, 1.0));
        assert!(signals.contains(&MovementSignal::MotionEnd));
        assert!(m.is_blocked());
        assert!(m.is_idle());
        m.unblock();
        assert!(!m.is_blocked());
    }

    #[test]
    fn movement_tick_rate_accepts_documented_values() {
        for rate in [20, 10, 5, 1] {
            let m = Movement::new(rate);
            assert_eq!(m.tick_rate_hz, rate);
        }
    }
}
