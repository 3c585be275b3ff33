//! Simulation Orchestrator (§2 SYSTEM OVERVIEW, §8 scenarios): composes the
//! Tick Scheduler with the cross-cutting subsystem tables -- Entity
//! Registry, Position Index, Fog of War, Region Triggers, Faction Table --
//! and drives the causal chains between them every tick.
//!
//! `TickLoop`'s [`SystemFn`](crate::tick::SystemFn) is a plain function
//! pointer so a registered system cannot close over these tables (they
//! aren't `World` components; the Faction Table, Position Index and Fog
//! Grid are deliberately kept outside the ECS, see `DESIGN.md`). This
//! module is the place those tables actually meet: grounded on
//! `original_source/src/game.c`'s `G_Update`, which calls every
//! subsystem's per-tick `*_Update` in a fixed order against shared
//! file-scope state -- `Simulation::tick` is that same fixed order,
//! expressed as method calls against owned tables instead of statics.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use skirmish_ecs::entity::EntityId;
use skirmish_ecs::event::{Event, EventKind};
use skirmish_ecs::flags::EntityFlags;
use skirmish_ecs::world::World;

use crate::combat::{CombatState, Combatant};
use crate::components::{register_shared_components, Faction, FactionTable, Position, VisionRange};
use crate::construction::Building;
use crate::entity_registry::EntityRegistry;
use crate::fog::FogGrid;
use crate::garrison::{compute_rendezvous, GarrisonCarrier, GarrisonUnit, HolderState, UnitState};
use crate::harvest::{Harvester, HarvesterState};
use crate::position_index::PositionIndex;
use crate::region::RegionTable;
use crate::resource::ResourceNode;
use crate::storage::StorageSite;
use crate::tick::{TickConfig, TickLoop};

/// Default hit points a builder contributes to a building's `hp` per
/// `construction_pass` while `Supplied`, absent a dedicated builder-unit
/// component this port doesn't otherwise need (see `DESIGN.md`).
pub const DEFAULT_BUILD_SPEED: u32 = 10;

/// Bundles the Tick Scheduler with every table a `SystemFn` cannot reach,
/// and drives the per-tick causal chains between them: diplomacy-gated
/// target acquisition and attack resolution, harvest delivery and resource
/// exhaustion, construction auto-supply and completion, and region
/// membership deltas.
pub struct Simulation {
    pub tick_loop: TickLoop,
    pub registry: EntityRegistry,
    pub positions: PositionIndex,
    pub fog: FogGrid,
    pub regions: RegionTable,
    pub factions: FactionTable,

    tracked: HashSet<EntityId>,
    combatants: HashSet<EntityId>,
    harvesters: HashSet<EntityId>,
    builders: HashSet<EntityId>,
    resources: HashSet<EntityId>,
    storage_sites: HashSet<EntityId>,

    /// Harvester -> resource it is currently drawing from. Not modeled on
    /// [`Harvester`] itself, which tracks a resource *name*/last-known
    /// position but not a UID (§4.H keeps the carry invariant name-keyed so
    /// a harvester can reacquire any same-type source, not just its last
    /// one); the orchestrator needs the concrete UID to call into the
    /// resource's own component.
    harvest_source: HashMap<EntityId, EntityId>,
    /// Harvester -> the storage site it delivers to.
    harvest_dest: HashMap<EntityId, EntityId>,
    /// Builder -> per-tick `hp` contribution, set at [`attach_building`](Self::attach_building).
    build_speed: HashMap<EntityId, u32>,
}

impl Simulation {
    pub fn new(bounds: (f32, f32, f32, f32), fog_tiles: (usize, usize), config: TickConfig) -> Self {
        let mut world = World::new();
        register_shared_components(&mut world);
        world.register_component::<Combatant>("combatant");
        world.register_component::<Harvester>("harvester");
        world.register_component::<Building>("building");
        world.register_component::<ResourceNode>("resource_node");
        world.register_component::<StorageSite>("storage_site");
        world.register_component::<GarrisonUnit>("garrison_unit");
        world.register_component::<GarrisonCarrier>("garrison_carrier");

        let (xmin, xmax, zmin, zmax) = bounds;
        Self {
            tick_loop: TickLoop::new(world, config),
            registry: EntityRegistry::new(),
            positions: PositionIndex::new(xmin, xmax, zmin, zmax),
            fog: FogGrid::new(fog_tiles.0, fog_tiles.1),
            regions: RegionTable::new(),
            factions: FactionTable::new(),
            tracked: HashSet::new(),
            combatants: HashSet::new(),
            harvesters: HashSet::new(),
            builders: HashSet::new(),
            resources: HashSet::new(),
            storage_sites: HashSet::new(),
            harvest_source: HashMap::new(),
            harvest_dest: HashMap::new(),
            build_speed: HashMap::new(),
        }
    }

    pub fn world(&self) -> &World {
        self.tick_loop.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.tick_loop.world_mut()
    }

    // -- spawning ----------------------------------------------------------

    /// Add `uid` to the active set and the Position Index, optionally
    /// reassigning its faction away from the default (faction 0) via
    /// [`EntityRegistry::faction_set`] so vision is wired atomically.
    pub fn spawn_entity(&mut self, flags: EntityFlags, pos: (f32, f32, f32), faction: u8) -> EntityId {
        let uid = self.registry.new_uid(self.tick_loop.world_mut());
        self.registry
            .add(self.tick_loop.world_mut(), uid, flags, Position(Vec3::new(pos.0, pos.1, pos.2)))
            .expect("new_uid always produces a fresh, unattached uid");
        if faction != 0 {
            self.registry
                .faction_set(self.tick_loop.world_mut(), &mut self.fog, uid, Faction(faction));
        }
        self.positions.set(uid, (pos.0, pos.2));
        self.tracked.insert(uid);
        uid
    }

    pub fn attach_combatant(&mut self, uid: EntityId, combatant: Combatant) {
        self.tick_loop.world_mut().insert_component(uid, combatant).ok();
        self.combatants.insert(uid);
    }

    pub fn attach_harvester(&mut self, uid: EntityId, harvester: Harvester) {
        self.tick_loop.world_mut().insert_component(uid, harvester).ok();
        self.harvesters.insert(uid);
    }

    pub fn attach_building(&mut self, uid: EntityId, building: Building, build_speed: u32) {
        self.tick_loop.world_mut().insert_component(uid, building).ok();
        self.builders.insert(uid);
        self.build_speed.insert(uid, build_speed.max(1));
    }

    pub fn attach_resource(&mut self, uid: EntityId, resource: ResourceNode) {
        self.tick_loop.world_mut().insert_component(uid, resource).ok();
        self.resources.insert(uid);
    }

    pub fn attach_storage_site(&mut self, uid: EntityId, site: StorageSite) {
        self.tick_loop.world_mut().insert_component(uid, site).ok();
        self.storage_sites.insert(uid);
    }

    pub fn despawn(&mut self, uid: EntityId) {
        self.positions.remove(uid);
        self.tracked.remove(&uid);
        self.combatants.remove(&uid);
        self.harvesters.remove(&uid);
        self.builders.remove(&uid);
        self.resources.remove(&uid);
        self.storage_sites.remove(&uid);
        self.harvest_source.remove(&uid);
        self.harvest_dest.remove(&uid);
        self.build_speed.remove(&uid);
        self.registry.remove(self.tick_loop.world_mut(), uid).ok();
    }

    /// Command a harvester to start gathering `resource` and delivering to
    /// `dest`. Movement/pathing to the resource is outside this core's
    /// scope (§1 Non-goals), so this begins harvesting immediately at the
    /// resource's current position, mirroring how `garrison.rs` and
    /// `movement.rs` both leave travel time to an external collaborator.
    pub fn order_gather(&mut self, harvester: EntityId, resource: EntityId, dest: EntityId) {
        let resource_pos = self.positions.get(resource).unwrap_or((0.0, 0.0));
        let resource_name = self
            .tick_loop
            .world()
            .get_component::<ResourceNode>(resource)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        self.harvest_source.insert(harvester, resource);
        self.harvest_dest.insert(harvester, dest);
        if let Some(h) = self.tick_loop.world_mut().get_component_mut::<Harvester>(harvester) {
            if h.begin_seek(&resource_name).is_ok() {
                h.begin_harvesting(resource_pos);
            }
        }
    }

    fn emit(&mut self, kind: EventKind, payload: serde_json::Value) {
        let simstate = self.tick_loop.simstate();
        self.tick_loop.event_bus_mut().notify_immediate(Event::engine(kind, payload), simstate);
    }

    // -- per-tick orchestration ---------------------------------------------

    /// Runs [`TickLoop::tick`] (the fixed-order `SystemFn` pass, command
    /// buffer apply, and rate-tick events), then drives every cross-module
    /// causal chain directly against the now-applied world state.
    pub fn tick(&mut self) -> Vec<skirmish_ecs::command::Command> {
        let applied = self.tick_loop.tick();
        self.combat_pass();
        self.harvest_pass();
        self.construction_pass();
        self.region_pass();
        applied
    }

    fn vision_of(&self, uid: EntityId) -> f32 {
        self.tick_loop
            .world()
            .get_component::<VisionRange>(uid)
            .map(|v| v.0)
            .unwrap_or(0.0)
    }

    /// §4.F + §8 scenario 2: every living combatant scans same-faction-war
    /// candidates from the Position Index, `select_target` picks among
    /// them (gated by stance, per the combat module's own rules), and an
    /// in-range attack resolves. Acquiring a target from `Idle` fires
    /// `ATTACK_START`; a kill fires `ENTITY_DEATH`/`ENTITY_DIED` and defers
    /// removal to the next [`EntityRegistry::flush_removed`].
    fn combat_pass(&mut self) {
        let sim_time = self.tick_loop.sim_time();
        let uids: Vec<EntityId> = self.combatants.iter().copied().collect();

        for uid in uids {
            let Some(pos) = self.positions.get(uid) else { continue };
            if !self.combatants.contains(&uid) {
                continue;
            }
            let my_faction = self.registry.faction_get(self.tick_loop.world(), uid).0;
            let vision = self.vision_of(uid);

            let nearby = self.positions.in_circle(pos, vision.max(1.0), 32);
            let mut candidates: Vec<(EntityId, f32)> = Vec::new();
            for other in nearby {
                if other == uid {
                    continue;
                }
                let Some(other_pos) = self.positions.get(other) else { continue };
                if self.tick_loop.world().get_component::<Combatant>(other).is_none() {
                    continue;
                }
                let other_faction = self.registry.faction_get(self.tick_loop.world(), other).0;
                if !self.factions.are_at_war(my_faction, other_faction) {
                    continue;
                }
                let dx = other_pos.0 - pos.0;
                let dz = other_pos.1 - pos.1;
                candidates.push((other, (dx * dx + dz * dz).sqrt()));
            }

            let (target, was_idle, already_engaged) = {
                let Some(combatant) = self.tick_loop.world().get_component::<Combatant>(uid) else { continue };
                if combatant.is_dead() {
                    continue;
                }
                let was_idle = matches!(combatant.state, CombatState::Idle);
                let Some(target) = combatant.select_target(&candidates) else { continue };
                let already_engaged = matches!(
                    combatant.state,
                    CombatState::Attacking { target: t } | CombatState::MovingToTarget { target: t } if t == target
                );
                (target, was_idle, already_engaged)
            };

            let target_dist = candidates.iter().find(|(u, _)| *u == target).map(|(_, d)| *d).unwrap_or(f32::MAX);
            const ATTACK_RANGE: f32 = 5.0;

            if !already_engaged {
                if let Some(combatant) = self.tick_loop.world_mut().get_component_mut::<Combatant>(uid) {
                    combatant.engage(target);
                }
                if was_idle {
                    self.emit(
                        EventKind::ATTACK_START,
                        serde_json::json!({ "attacker": format!("{uid:?}"), "target": format!("{target:?}") }),
                    );
                }
            }
            if target_dist <= ATTACK_RANGE {
                if let Some(combatant) = self.tick_loop.world_mut().get_component_mut::<Combatant>(uid) {
                    combatant.begin_attacking(target);
                }
            }

            let attacking = matches!(
                self.tick_loop.world().get_component::<Combatant>(uid).map(|c| c.state),
                Some(CombatState::Attacking { .. })
            );
            if !attacking {
                continue;
            }
            let can_attack = self
                .tick_loop
                .world()
                .get_component::<Combatant>(uid)
                .is_some_and(|c| c.can_attack(sim_time));
            if !can_attack {
                continue;
            }
            let Some(target_hp) = self.tick_loop.world().get_component::<Combatant>(target).map(|c| c.hp) else {
                continue;
            };
            let base_damage = {
                let Some(attacker) = self.tick_loop.world_mut().get_component_mut::<Combatant>(uid) else { continue };
                attacker.attack(sim_time, target_hp);
                attacker.base_damage
            };
            let died = {
                let Some(victim) = self.tick_loop.world_mut().get_component_mut::<Combatant>(target) else { continue };
                victim.on_attacked(uid);
                victim.take_damage(base_damage)
            };
            if died {
                self.emit(EventKind::ENTITY_DEATH, serde_json::json!({ "entity": format!("{target:?}") }));
                self.emit(EventKind::ENTITY_DIED, serde_json::json!({ "entity": format!("{target:?}") }));
                self.registry.defer_remove(target);
            }
        }
    }

    /// §4.H + §8 scenario 1: advance every `Harvesting` harvester by
    /// drawing from its resource's actual remaining amount (rather than a
    /// blind `gather_speed`, so the sum delivered across N harvesters never
    /// exceeds what the resource held), then instantly deliver a full load
    /// to its storage site (travel time is out of scope, as in
    /// `order_gather`'s doc comment).
    fn harvest_pass(&mut self) {
        let uids: Vec<EntityId> = self.harvesters.iter().copied().collect();
        for uid in uids {
            let state = self.tick_loop.world().get_component::<Harvester>(uid).map(|h| h.state);
            match state {
                Some(HarvesterState::Harvesting) => self.harvest_gather_one(uid),
                Some(HarvesterState::SeekingStorage) => self.harvest_deliver_one(uid),
                _ => {}
            }
        }
    }

    fn harvest_gather_one(&mut self, uid: EntityId) {
        let Some(&resource_uid) = self.harvest_source.get(&uid) else { return };
        let gather_speed = self
            .tick_loop
            .world()
            .get_component::<Harvester>(uid)
            .map(|h| h.gather_speed as i32)
            .unwrap_or(0);

        let result = {
            let Some(resource) = self.tick_loop.world_mut().get_component_mut::<ResourceNode>(resource_uid) else {
                return;
            };
            resource.harvest(gather_speed)
        };
        let actual = result.old - result.new;

        if let Some(harvester) = self.tick_loop.world_mut().get_component_mut::<Harvester>(uid) {
            let room = (harvester.max_carry - harvester.curr_carry).max(0);
            harvester.curr_carry += actual.min(room).max(0);
            if harvester.is_full() {
                harvester.begin_seeking_storage();
            }
        }

        if result.newly_exhausted {
            self.emit(EventKind::RESOURCE_EXHAUSTED, serde_json::json!({ "resource": format!("{resource_uid:?}") }));
            let replenishable = self
                .tick_loop
                .world()
                .get_component::<ResourceNode>(resource_uid)
                .is_some_and(|r| r.replenishable);
            if replenishable {
                let was_storage_site = self.storage_sites.contains(&resource_uid);
                if was_storage_site {
                    let mut site = self
                        .tick_loop
                        .world()
                        .get_component::<StorageSite>(resource_uid)
                        .cloned()
                        .unwrap_or_default();
                    if let Some(resource) = self.tick_loop.world_mut().get_component_mut::<ResourceNode>(resource_uid) {
                        resource.begin_replenishing(&mut site, true);
                    }
                    if let Some(slot) = self.tick_loop.world_mut().get_component_mut::<StorageSite>(resource_uid) {
                        *slot = site;
                    }
                } else {
                    let mut site = StorageSite::new();
                    if let Some(resource) = self.tick_loop.world_mut().get_component_mut::<ResourceNode>(resource_uid) {
                        resource.begin_replenishing(&mut site, false);
                    }
                    self.tick_loop.world_mut().insert_component(resource_uid, site).ok();
                    self.storage_sites.insert(resource_uid);
                }
            }
        }

        let exhausted = self
            .tick_loop
            .world()
            .get_component::<ResourceNode>(resource_uid)
            .is_some_and(|r| r.is_exhausted());
        // A harvester with nothing left to draw has nothing more to do here
        // (whether the node is dry for good or now collecting a replenish
        // deposit, either way there's no more to harvest); one that just
        // filled up is already headed to storage and must not be stopped
        // out from under that.
        if exhausted {
            if let Some(harvester) = self.tick_loop.world_mut().get_component_mut::<Harvester>(uid) {
                if !harvester.is_full() {
                    harvester.stop();
                }
            }
        }
    }

    fn harvest_deliver_one(&mut self, uid: EntityId) {
        let Some(&dest) = self.harvest_dest.get(&uid) else { return };
        let Some(resource_name) = self
            .tick_loop
            .world()
            .get_component::<Harvester>(uid)
            .and_then(|h| h.carry_resource.clone())
        else {
            return;
        };
        let delivered = self
            .tick_loop
            .world_mut()
            .get_component_mut::<Harvester>(uid)
            .map(|h| h.deliver())
            .unwrap_or(0);
        if delivered == 0 {
            return;
        }
        if let Some(site) = self.tick_loop.world_mut().get_component_mut::<StorageSite>(dest) {
            let new_amount = site.current(&resource_name) + delivered;
            site.set_curr(&resource_name, new_amount);
        }
        self.emit(
            EventKind::RESOURCE_DROPPED_OFF,
            serde_json::json!({ "harvester": format!("{uid:?}"), "dest": format!("{dest:?}"), "amount": delivered }),
        );

        let resource_uid = self.harvest_source.get(&uid).copied();
        let exhausted = resource_uid
            .and_then(|r| self.tick_loop.world().get_component::<ResourceNode>(r))
            .is_some_and(|r| r.is_exhausted() && !r.is_replenishing());
        if exhausted {
            if let Some(harvester) = self.tick_loop.world_mut().get_component_mut::<Harvester>(uid) {
                harvester.stop();
            }
            return;
        }
        let Some(resource_uid) = resource_uid else { return };
        let resource_pos = self.positions.get(resource_uid).unwrap_or((0.0, 0.0));
        if let Some(harvester) = self.tick_loop.world_mut().get_component_mut::<Harvester>(uid) {
            harvester.begin_harvesting(resource_pos);
        }
    }

    /// §4.G + §8 scenario 3: a `Founded` building auto-supplies once its
    /// storage site saturates (the "Open question" in `SPEC_FULL.md` §9 on
    /// implicit `supply`), then accrues `hp` from its builder's
    /// `build_speed` each tick while `Supplied`, completing (and firing
    /// `BUILDING_COMPLETED` exactly once, guaranteed by the state
    /// machine's monotonic transition) once `hp` reaches `max_hp`.
    fn construction_pass(&mut self) {
        let uids: Vec<EntityId> = self.builders.iter().copied().collect();
        for uid in uids {
            let state = self.tick_loop.world().get_component::<Building>(uid).map(|b| b.state);
            match state {
                Some(crate::construction::BuildingState::Founded) => {
                    let saturated = self
                        .tick_loop
                        .world()
                        .get_component::<StorageSite>(uid)
                        .is_some_and(|s| s.is_saturated_any());
                    if saturated {
                        if let Some(building) = self.tick_loop.world_mut().get_component_mut::<Building>(uid) {
                            building.supply().ok();
                        }
                        self.emit(EventKind::BUILD_END, serde_json::json!({ "building": format!("{uid:?}") }));
                    }
                }
                Some(crate::construction::BuildingState::Supplied) => {
                    let speed = self.build_speed.get(&uid).copied().unwrap_or(DEFAULT_BUILD_SPEED);
                    let completed = {
                        let Some(building) = self.tick_loop.world_mut().get_component_mut::<Building>(uid) else {
                            continue;
                        };
                        building.advance_hp(speed);
                        building.progress() >= 1.0
                    };
                    if completed {
                        if let Some(building) = self.tick_loop.world_mut().get_component_mut::<Building>(uid) {
                            building.complete().ok();
                        }
                        self.emit(EventKind::BUILDING_COMPLETED, serde_json::json!({ "building": format!("{uid:?}") }));
                    }
                }
                _ => {}
            }
        }
    }

    /// §4.L + §8 scenario 4: recompute region membership from the
    /// currently tracked entities' positions and emit the enter/exit
    /// delta.
    fn region_pass(&mut self) {
        let positions: Vec<(EntityId, (f32, f32))> = self
            .tracked
            .iter()
            .filter_map(|&uid| self.positions.get(uid).map(|xz| (uid, xz)))
            .collect();
        let events = self.regions.tick(&positions);
        for (name, event, entity) in events {
            let kind = match event {
                crate::region::RegionEvent::Entered => EventKind::ENTERED_REGION,
                crate::region::RegionEvent::Exited => EventKind::EXITED_REGION,
            };
            self.emit(kind, serde_json::json!({ "region": name, "entity": format!("{entity:?}") }));
        }
    }

    // -- garrison command surface (§4.J + §8 scenario 6) --------------------

    /// Order `unit` to board `carrier`. If they're already within
    /// [`crate::garrison::GARRISON_THRESHOLD_DIST`] and the carrier has
    /// room, boards immediately; otherwise computes a rendezvous (for a
    /// land unit boarding a water-borne carrier) and records it on both
    /// sides so a later eviction can send the carrier back for stragglers.
    pub fn order_garrison(
        &mut self,
        unit: EntityId,
        carrier: EntityId,
        land_candidates: &[(f32, f32)],
        water_candidates: &[(f32, f32)],
    ) {
        let unit_pos = self.positions.get(unit).unwrap_or((0.0, 0.0));
        let carrier_pos = self.positions.get(carrier).unwrap_or((0.0, 0.0));
        let consumed = self
            .tick_loop
            .world()
            .get_component::<GarrisonUnit>(unit)
            .map(|u| u.capacity_consumed)
            .unwrap_or(1);
        let has_room = self
            .tick_loop
            .world()
            .get_component::<GarrisonCarrier>(carrier)
            .is_some_and(|c| c.has_room(consumed));

        let rendezvous = compute_rendezvous(unit_pos, carrier_pos, land_candidates, water_candidates);

        if let Some(rp) = rendezvous {
            if let Some(carrier_state) = self.tick_loop.world_mut().get_component_mut::<GarrisonCarrier>(carrier) {
                carrier_state.set_rendezvous(rp.water_tile);
            }
        }

        if let Some(u) = self.tick_loop.world_mut().get_component_mut::<GarrisonUnit>(unit) {
            match rendezvous {
                Some(rp) => u.order_board_via_rendezvous(carrier, rp),
                None => u.order_board(carrier),
            }
        }

        if has_room {
            self.board_unit(unit, carrier, consumed);
        } else if let Some(u) = self.tick_loop.world_mut().get_component_mut::<GarrisonUnit>(unit) {
            u.arrive_at_carrier(false);
        }
    }

    fn board_unit(&mut self, unit: EntityId, carrier: EntityId, consumed: u32) {
        let boarded = self
            .tick_loop
            .world_mut()
            .get_component_mut::<GarrisonCarrier>(carrier)
            .is_some_and(|c| c.board(unit, consumed));
        if boarded {
            if let Some(u) = self.tick_loop.world_mut().get_component_mut::<GarrisonUnit>(unit) {
                u.arrive_at_carrier(true);
            }
            self.positions.garrison(unit);
        }
    }

    /// Evict the next occupant (FIFO, delay-gated) and, if units remain
    /// `AwaitingPickup`, send the carrier back to the rendezvous for them.
    /// Returns the evicted unit, if any.
    pub fn evict_from_carrier(&mut self, carrier: EntityId, now_ms: u64, drop_xz: (f32, f32)) -> Option<EntityId> {
        let evicted = self
            .tick_loop
            .world_mut()
            .get_component_mut::<GarrisonCarrier>(carrier)?
            .evict_next(now_ms, |_| 1);
        let evicted = evicted?;

        if let Some(u) = self.tick_loop.world_mut().get_component_mut::<GarrisonUnit>(evicted) {
            u.evict();
        }
        self.positions.ungarrison(evicted, drop_xz);

        if let Some(carrier_state) = self.tick_loop.world_mut().get_component_mut::<GarrisonCarrier>(carrier) {
            carrier_state.begin_return_to_rendezvous();
        }
        Some(evicted)
    }

    /// The carrier's state after [`evict_from_carrier`](Self::evict_from_carrier)
    /// sent it back to the rendezvous; `None` if it never boarded anyone.
    pub fn carrier_state(&self, carrier: EntityId) -> Option<HolderState> {
        self.tick_loop.world().get_component::<GarrisonCarrier>(carrier).map(|c| c.state)
    }

    /// A unit's garrison state, for test/observer assertions.
    pub fn unit_state(&self, unit: EntityId) -> Option<UnitState> {
        self.tick_loop.world().get_component::<GarrisonUnit>(unit).map(|u| u.state)
    }
}
