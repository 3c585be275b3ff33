//! Render Workspace (§4.N): the double-buffered handoff between the
//! simulation and the renderer, plus the per-frame frustum-cull + fog-gate
//! visibility pass that feeds it.
//!
//! No original-source file models this split (the original's renderer is
//! an external, out-of-scope collaborator per §1); the double-buffer
//! swap/drain-assert discipline here is this port's own design against the
//! ordering guarantees described for this module, written in the style of
//! [`crate::event_bus`]'s explicit queue-draining handoff.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }
}

/// A plane as `normal . p + d >= 0` for points inside the half-space.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn signed_dist(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// A view frustum as 6 inward-facing planes (near, far, left, right, top,
/// bottom).
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// An AABB is outside the frustum if, for any plane, every corner lies
    /// in that plane's negative half-space (the standard p-vertex
    /// rejection test).
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let corners = aabb.corners();
        for plane in &self.planes {
            if corners.iter().all(|&c| plane.signed_dist(c) < 0.0) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderKind {
    Static,
    Animated,
}

/// One renderable entity's visibility inputs for a frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderCandidate {
    pub uid: EntityId,
    pub kind: RenderKind,
    pub world_aabb: Aabb,
    pub pos: (f32, f32),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisibleLists {
    pub static_entities: Vec<EntityId>,
    pub animated_entities: Vec<EntityId>,
}

impl VisibleLists {
    fn push(&mut self, kind: RenderKind, uid: EntityId) {
        match kind {
            RenderKind::Static => self.static_entities.push(uid),
            RenderKind::Animated => self.animated_entities.push(uid),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub cam_visible: VisibleLists,
    pub light_visible: VisibleLists,
}

/// Frustum-cull `candidates` against `cam_frustum` and `light_frustum`,
/// further gating camera visibility by `fog_visible` (per §4.K, only
/// entities the viewer's factions can currently see through fog are
/// included in `cam_visible`; light visibility -- used for shadow casting
/// -- is unaffected by fog).
pub fn build_frame(
    candidates: &[RenderCandidate],
    cam_frustum: &Frustum,
    light_frustum: &Frustum,
    fog_visible: impl Fn((f32, f32)) -> bool,
) -> FrameSnapshot {
    let mut frame = FrameSnapshot::default();
    for candidate in candidates {
        if cam_frustum.intersects_aabb(&candidate.world_aabb) && fog_visible(candidate.pos) {
            frame.cam_visible.push(candidate.kind, candidate.uid);
        }
        if light_frustum.intersects_aabb(&candidate.world_aabb) {
            frame.light_visible.push(candidate.kind, candidate.uid);
        }
    }
    frame
}

/// The double-buffered sim-writes/renderer-reads handoff. The simulation
/// always writes into `slots[curr]`; the renderer always reads
/// `slots[(curr+1) % 2]`, the most recently completed frame.
#[derive(Debug, Clone, Default)]
pub struct RenderWorkspace {
    slots: [Option<FrameSnapshot>; 2],
    curr: usize,
    /// Whether `slots[i]` holds a frame the renderer has not yet consumed.
    pending: [bool; 2],
}

impl RenderWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation-side: publish this tick's frame into the write slot.
    pub fn push_frame(&mut self, frame: FrameSnapshot) {
        self.slots[self.curr] = Some(frame);
        self.pending[self.curr] = true;
    }

    /// Renderer-side: take the most recently completed frame, if any is
    /// pending. Marks it drained.
    pub fn consume(&mut self) -> Option<FrameSnapshot> {
        let read_idx = (self.curr + 1) % 2;
        if !self.pending[read_idx] {
            return None;
        }
        self.pending[read_idx] = false;
        self.slots[read_idx].clone()
    }

    /// Simulation-side: advance to the next write slot. The slot this
    /// makes writable was the renderer's read slot; asserts it has already
    /// been drained via [`Self::consume`] so the renderer never loses an
    /// unconsumed frame out from under it.
    pub fn swap(&mut self) {
        let next_write = (self.curr + 1) % 2;
        debug_assert!(
            !self.pending[next_write],
            "renderer has not drained its queue before this swap"
        );
        self.pending[next_write] = false;
        self.curr = next_write;
    }

    pub fn has_pending_frame(&self) -> bool {
        let read_idx = (self.curr + 1) % 2;
        self.pending[read_idx]
    }
}
