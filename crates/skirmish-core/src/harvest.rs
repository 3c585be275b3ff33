//! Harvest/Transport (§4.H): the harvester state machine, transport
//! strategies, and the queued-command slot for deferred post-drop-off
//! actions.
//!
//! Grounded on `original_source/src/game/harvester.c`'s
//! `enum harvester_state` (`STATE_NOT_HARVESTING` ..
//! `STATE_TRANSPORT_HARVESTING`), `enum tstrategy`
//! (`TRANSPORT_STRATEGY_{NEAREST,EXCESS,GATHERING}`), and the
//! `REACQUIRE_RADIUS` constant used by `nearest_storage_site_source`.

use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;
use thiserror::Error;

/// Radius (world units) searched for a same-type resource replacement on
/// exhaustion, before falling back to a forced drop-off.
pub const REACQUIRE_RADIUS: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvesterState {
    Idle,
    SeekingResource,
    Harvesting,
    SeekingStorage,
    TransportGetting,
    TransportPutting,
    TransportSeekingResource,
    TransportHarvesting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportStrategy {
    /// Pick the nearest eligible source.
    Nearest,
    /// Prefer sources holding more than their desired amount; fall back to
    /// `Nearest` if none qualify.
    Excess,
    /// Try to gather the resource directly before looking for a source.
    Gathering,
}

/// A queued action a harvester performs once it has dropped off an
/// incompatible carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueuedCommand {
    Gather(EntityId),
    Transport { source: EntityId, dest: EntityId },
    Build(EntityId),
    Supply(EntityId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HarvestError {
    #[error("harvester already carries a different resource: {0}")]
    ResourceMismatch(String),
}

/// Per-entity, per-resource-type harvesting/carrying state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Harvester {
    pub state: HarvesterState,
    pub strategy: TransportStrategy,
    /// Amount gathered per completed harvest animation cycle.
    pub gather_speed: f32,
    pub max_carry: i32,
    pub curr_carry: i32,
    /// `None` while carrying nothing.
    pub carry_resource: Option<String>,
    /// Ordered resource-type preference, highest priority first.
    pub priority: Vec<String>,
    pub queued: Option<QueuedCommand>,
    last_known_resource_pos: Option<(f32, f32)>,
}

impl Harvester {
    pub fn new(gather_speed: f32, max_carry: i32) -> Self {
        Self {
            state: HarvesterState::Idle,
            strategy: TransportStrategy::Nearest,
            gather_speed,
            max_carry,
            curr_carry: 0,
            carry_resource: None,
            priority: Vec::new(),
            queued: None,
            last_known_resource_pos: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == HarvesterState::Idle
    }

    pub fn is_full(&self) -> bool {
        self.curr_carry >= self.max_carry
    }

    /// Forces a drop-off of whatever is currently carried, if any. Required
    /// before switching target resource (invariant: a harvester never mixes
    /// resources).
    pub fn force_drop_off(&mut self) -> i32 {
        let dropped = self.curr_carry;
        self.curr_carry = 0;
        self.carry_resource = None;
        dropped
    }

    /// Begin seeking `resource`. If already carrying a *different*
    /// resource, the caller must drop off first (§4.H invariant) -- this
    /// returns an error rather than silently discarding the carry.
    pub fn begin_seek(&mut self, resource: &str) -> Result<(), HarvestError> {
        if let Some(carrying) = &self.carry_resource {
            if carrying != resource && self.curr_carry > 0 {
                return Err(HarvestError::ResourceMismatch(carrying.clone()));
            }
        }
        self.carry_resource = Some(resource.to_owned());
        self.state = HarvesterState::SeekingResource;
        Ok(())
    }

    pub fn begin_harvesting(&mut self, resource_pos: (f32, f32)) {
        self.state = HarvesterState::Harvesting;
        self.last_known_resource_pos = Some(resource_pos);
    }

    /// One harvest animation cycle completes: gather up to `gather_speed`,
    /// clamped to capacity. Transitions to seeking storage once full.
    pub fn tick_gather(&mut self) {
        let gained = (self.gather_speed as i32).min(self.max_carry - self.curr_carry);
        self.curr_carry += gained.max(0);
        if self.is_full() {
            self.state = HarvesterState::SeekingStorage;
        }
    }

    pub fn begin_seeking_storage(&mut self) {
        self.state = HarvesterState::SeekingStorage;
    }

    pub fn deliver(&mut self) -> i32 {
        let delivered = self.curr_carry;
        self.curr_carry = 0;
        self.state = HarvesterState::Idle;
        delivered
    }

    pub fn stop(&mut self) {
        self.state = HarvesterState::Idle;
        self.queued = None;
    }

    /// Last known position of the resource this harvester was working, used
    /// as the origin for a `REACQUIRE_RADIUS` retarget search on exhaustion.
    pub fn last_known_resource_pos(&self) -> Option<(f32, f32)> {
        self.last_known_resource_pos
    }

    // -- transport mode -------------------------------------------------

    pub fn begin_transport_getting(&mut self) {
        self.state = HarvesterState::TransportGetting;
    }

    pub fn begin_transport_putting(&mut self) {
        self.state = HarvesterState::TransportPutting;
    }

    pub fn begin_transport_seeking_resource(&mut self) {
        self.state = HarvesterState::TransportSeekingResource;
    }

    pub fn begin_transport_harvesting(&mut self, resource_pos: (f32, f32)) {
        self.state = HarvesterState::TransportHarvesting;
        self.last_known_resource_pos = Some(resource_pos);
    }
}

/// Pick a replacement source among `candidates` (pre-filtered to the same
/// resource type and within [`REACQUIRE_RADIUS`] by the caller) under
/// `strategy`. `desired_vs_stored` maps each candidate to `(desired,
/// stored)` so `Excess` can prefer over-desired sites without this module
/// depending on [`crate::storage::StorageSite`] directly.
pub fn select_source(
    strategy: TransportStrategy,
    candidates: &[(EntityId, f32)],
    desired_vs_stored: impl Fn(EntityId) -> (i32, i32),
) -> Option<EntityId> {
    if candidates.is_empty() {
        return None;
    }
    match strategy {
        TransportStrategy::Excess => {
            let mut best: Option<(f32, EntityId)> = None;
            for &(uid, dist) in candidates {
                let (desired, stored) = desired_vs_stored(uid);
                if stored <= desired {
                    continue;
                }
                if best.is_none_or_closer(dist) {
                    best = Some((dist, uid));
                }
            }
            best.map(|(_, uid)| uid).or_else(|| {
                nearest(candidates)
            })
        }
        TransportStrategy::Nearest | TransportStrategy::Gathering => nearest(candidates),
    }
}

fn nearest(candidates: &[(EntityId, f32)]) -> Option<EntityId> {
    candidates
        .iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|&(uid, _)| uid)
}

trait CloserCheck {
    fn is_none_or_closer(&self, dist: f32) -> bool;
}
impl CloserCheck for Option<(f32, EntityId)> {
    fn is_none_or_closer(&self, dist: f32) -> bool {
        match self {
            Some((best_dist, _)) => dist < *best_dist,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(i: u32) -> EntityId {
        EntityId::new(i, 0)
    }

    #[test]
    fn gather_cycles_fill_up_to_max_carry() {
        let mut h = Harvester::new(10.0, 25);
        h.begin_seek("wood").unwrap();
        h.begin_harvesting((0.0, 0.0));
        h.tick_gather();
        h.tick_gather();
        assert_eq!(h.curr_carry, 20);
        h.tick_gather();
        assert_eq!(h.curr_carry, 25, "clamped to max_carry");
        assert_eq!(h.state, HarvesterState::SeekingStorage);
    }

    #[test]
    fn begin_seek_different_resource_while_carrying_errors() {
        let mut h = Harvester::new(10.0, 25);
        h.begin_seek("wood").unwrap();
        h.curr_carry = 5;
        let err = h.begin_seek("stone").unwrap_err();
        assert_eq!(err, HarvestError::ResourceMismatch("wood".to_owned()));
    }

    #[test]
    fn force_drop_off_clears_carry_and_resource() {
        let mut h = Harvester::new(10.0, 25);
        h.begin_seek("wood").unwrap();
        h.curr_carry = 12;
        let dropped = h.force_drop_off();
        assert_eq!(dropped, 12);
        assert_eq!(h.curr_carry, 0);
        assert!(h.carry_resource.is_none());
    }

    #[test]
    fn deliver_returns_carry_and_goes_idle() {
        let mut h = Harvester::new(10.0, 25);
        h.curr_carry = 20;
        let delivered = h.deliver();
        assert_eq!(delivered, 20);
        assert!(h.is_idle());
    }

    #[test]
    fn select_source_nearest_picks_closest() {
        let candidates = [(eid(1), 10.0), (eid(2), 3.0), (eid(3), 7.0)];
        let picked = select_source(TransportStrategy::Nearest, &candidates, |_| (0, 0));
        assert_eq!(picked, Some(eid(2)));
    }

    #[test]
    fn select_source_excess_prefers_overstocked_site() {
        let candidates = [(eid(1), 2.0), (eid(2), 10.0)];
        // eid(1) is closer but at desired; eid(2) holds excess.
        let picked = select_source(TransportStrategy::Excess, &candidates, |uid| {
            if uid == eid(2) {
                (5, 20)
            } else {
                (5, 5)
            }
        });
        assert_eq!(picked, Some(eid(2)));
    }

    #[test]
    fn select_source_excess_falls_back_to_nearest_when_none_excess() {
        let candidates = [(eid(1), 2.0), (eid(2), 10.0)];
        let picked = select_source(TransportStrategy::Excess, &candidates, |_| (10, 5));
        assert_eq!(picked, Some(eid(1)), "no excess sites, falls back to nearest");
    }

    #[test]
    fn select_source_empty_candidates_returns_none() {
        assert_eq!(select_source(TransportStrategy::Nearest, &[], |_| (0, 0)), None);
    }
}
