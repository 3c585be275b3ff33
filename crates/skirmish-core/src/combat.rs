//! Combat (§4.F): per-entity combat state, stances, target acquisition,
//! and hit resolution.
//!
//! Grounded on `original_source/src/entity.h`'s `ENTITY_FLAG_COMBATABLE`
//! and the `game.c` call sites `G_Combat_AddEntity(uid,
//! COMBAT_STANCE_AGGRESSIVE)` / `G_Combat_SetStance(uid,
//! COMBAT_STANCE_AGGRESSIVE)`. No standalone `combat.c` made it into the
//! retrieval pack, so the state machine and target-selection policy below
//! are built directly from the stance/target semantics given here rather
//! than ported line-for-line from unseen original logic -- see
//! `DESIGN.md`.

use serde::{Deserialize, Serialize};
use skirmish_ecs::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    /// Acquire enemies within vision on its own initiative.
    Aggressive,
    /// Only fight back when attacked.
    Defensive,
    /// Never acquire a target, not even in self-defense.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatState {
    Idle,
    Attacking { target: EntityId },
    MovingToTarget { target: EntityId },
    Dead,
}

/// Bias (world units) the current target must be beaten by for target
/// selection to switch away from it, preventing rapid retargeting between
/// two near-equidistant enemies.
pub const RETARGET_HYSTERESIS: f32 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub state: CombatState,
    pub stance: Stance,
    pub hp: i32,
    pub max_hp: i32,
    pub base_damage: i32,
    pub vision_range: f32,
    /// Simulation time (seconds) the next attack is eligible to land;
    /// driven off the gameplay clock so it naturally absorbs simstate
    /// pause deltas rather than tracking its own remaining cooldown.
    pub next_attack_sim_time: f64,
    pub attack_cooldown: f64,
}

impl Combatant {
    pub fn new(max_hp: i32, base_damage: i32, vision_range: f32, attack_cooldown: f64) -> Self {
        Self {
            state: CombatState::Idle,
            stance: Stance::Aggressive,
            hp: max_hp,
            max_hp,
            base_damage,
            vision_range,
            next_attack_sim_time: 0.0,
            attack_cooldown,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, CombatState::Dead)
    }

    pub fn set_stance(&mut self, stance: Stance) {
        self.stance = stance;
        if stance == Stance::Hold && !self.is_dead() {
            self.state = CombatState::Idle;
        }
    }

    /// Choose among `candidates` (enemy entity, distance) the
    /// lowest-distance target, with a hysteresis bias keeping the current
    /// target unless some other candidate beats it by more than
    /// [`RETARGET_HYSTERESIS`].
    ///
    /// `Defensive` combatants never proactively vision-scan from `Idle` --
    /// they only fight back once [`on_attacked`](Self::on_attacked) has
    /// engaged them -- so this only considers candidates while already
    /// engaged (`Attacking`/`MovingToTarget`), letting a retaliating
    /// combatant still pick the best of several attackers.
    pub fn select_target(&self, candidates: &[(EntityId, f32)]) -> Option<EntityId> {
        if self.stance == Stance::Hold || candidates.is_empty() {
            return None;
        }
        let currently_engaged = matches!(
            self.state,
            CombatState::Attacking { .. } | CombatState::MovingToTarget { .. }
        );
        if self.stance == Stance::Defensive && !currently_engaged {
            return None;
        }
        let in_vision: Vec<&(EntityId, f32)> = candidates
            .iter()
            .filter(|(_, dist)| *dist <= self.vision_range)
            .collect();
        if in_vision.is_empty() {
            return None;
        }
        let (best_uid, best_dist) = *in_vision
            .iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();

        if let CombatState::Attacking { target } | CombatState::MovingToTarget { target } = self.state {
            if let Some(&(_, curr_dist)) = in_vision.iter().find(|(uid, _)| *uid == target).map(|v| &**v) {
                if curr_dist <= best_dist + RETARGET_HYSTERESIS {
                    return Some(target);
                }
            }
        }
        Some(best_uid)
    }

    /// Begin moving toward `target` (out of attack range).
    pub fn engage(&mut self, target: EntityId) {
        if !self.is_dead() {
            self.state = CombatState::MovingToTarget { target };
        }
    }

    /// Navigation has closed to attack range; begin exchanging hits.
    pub fn begin_attacking(&mut self, target: EntityId) {
        if !self.is_dead() {
            self.state = CombatState::Attacking { target };
        }
    }

    pub fn clear_target(&mut self) {
        if !self.is_dead() {
            self.state = CombatState::Idle;
        }
    }

    /// Respond to taking a hit from `attacker`. `Hold` never acquires a
    /// target, not even in self-defense; `Aggressive`/`Defensive` engage the
    /// attacker unless already fighting someone else, letting
    /// [`select_target`](Self::select_target) re-evaluate among candidates
    /// from there.
    pub fn on_attacked(&mut self, attacker: EntityId) {
        if self.is_dead() || self.stance == Stance::Hold {
            return;
        }
        if matches!(self.state, CombatState::Idle) {
            self.state = CombatState::MovingToTarget { target: attacker };
        }
    }

    /// Whether an attack may land this instant, given the current
    /// gameplay-clock `sim_time`.
    pub fn can_attack(&self, sim_time: f64) -> bool {
        !self.is_dead() && sim_time >= self.next_attack_sim_time
    }

    /// Land a hit, applying `self.base_damage` to `target_hp`. Returns the
    /// target's HP after the hit and whether it died. Resets this
    /// combatant's cooldown off `sim_time`, the gameplay clock, so a pause
    /// freezes the cooldown exactly as it freezes everything else timed
    /// off that clock (§4.D).
    pub fn attack(&mut self, sim_time: f64, target_hp: i32) -> (i32, bool) {
        debug_assert!(self.can_attack(sim_time));
        self.next_attack_sim_time = sim_time + self.attack_cooldown;
        let remaining = (target_hp - self.base_damage).max(0);
        (remaining, remaining == 0)
    }

    /// Apply incoming damage to self. Returns `true` if this kills the
    /// entity (transitions it to `Dead`/zombie).
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = (self.hp - amount).max(0);
        if self.hp == 0 {
            self.state = CombatState::Dead;
            true
        } else {
            false
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
    fn select_target_picks_nearest_enemy_in_vision() {
        let c = Combatant::new(100, 10, 20.0, 1.0);
        let candidates = [(eid(1), 15.0), (eid(2), 5.0), (eid(3), 50.0)];
        assert_eq!(c.select_target(&candidates), Some(eid(2)));
    }

    #[test]
    fn select_target_ignores_enemies_outside_vision() {
        let c = Combatant::new(100, 10, 20.0, 1.0);
        let candidates = [(eid(1), 50.0)];
        assert_eq!(c.select_target(&candidates), None);
    }

    #[test]
    fn hysteresis_keeps_current_target_within_bias() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.begin_attacking(eid(1));
        // eid(2) is closer but not by more than RETARGET_HYSTERESIS.
        let candidates = [(eid(1), 10.0), (eid(2), 9.0)];
        assert_eq!(c.select_target(&candidates), Some(eid(1)));
    }

    #[test]
    fn hysteresis_switches_when_beaten_by_more_than_bias() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.begin_attacking(eid(1));
        let candidates = [(eid(1), 10.0), (eid(2), 3.0)];
        assert_eq!(c.select_target(&candidates), Some(eid(2)));
    }

    #[test]
    fn hold_stance_never_selects_a_target() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.set_stance(Stance::Hold);
        let candidates = [(eid(1), 1.0)];
        assert_eq!(c.select_target(&candidates), None);
    }

    #[test]
    fn attack_respects_cooldown_keyed_off_sim_time() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        assert!(c.can_attack(0.0));
        c.attack(0.0, 100);
        assert!(!c.can_attack(0.5), "cooldown not yet elapsed");
        assert!(c.can_attack(1.0));
    }

    #[test]
    fn attack_reports_target_death_at_zero_hp() {
        let mut c = Combatant::new(100, 50, 50.0, 1.0);
        let (remaining, died) = c.attack(0.0, 50);
        assert_eq!(remaining, 0);
        assert!(died);
    }

    #[test]
    fn take_damage_transitions_to_dead_at_zero_hp() {
        let mut c = Combatant::new(30, 10, 50.0, 1.0);
        c.begin_attacking(eid(1));
        assert!(!c.take_damage(20));
        assert!(c.take_damage(10));
        assert!(c.is_dead());
    }

    #[test]
    fn defensive_stance_does_not_proactively_acquire_from_idle() {
        let c = Combatant::new(100, 10, 50.0, 1.0);
        let mut c = c;
        c.set_stance(Stance::Defensive);
        let candidates = [(eid(1), 1.0)];
        assert_eq!(c.select_target(&candidates), None);
    }

    #[test]
    fn defensive_stance_retargets_once_engaged_by_retaliation() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.set_stance(Stance::Defensive);
        c.on_attacked(eid(1));
        let candidates = [(eid(1), 15.0), (eid(2), 5.0)];
        assert_eq!(c.select_target(&candidates), Some(eid(2)));
    }

    #[test]
    fn on_attacked_engages_aggressive_from_idle() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.on_attacked(eid(1));
        assert_eq!(c.state, CombatState::MovingToTarget { target: eid(1) });
    }

    #[test]
    fn hold_stance_ignores_on_attacked() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.set_stance(Stance::Hold);
        c.on_attacked(eid(1));
        assert_eq!(c.state, CombatState::Idle);
    }

    #[test]
    fn set_stance_hold_clears_an_in_progress_target() {
        let mut c = Combatant::new(100, 10, 50.0, 1.0);
        c.begin_attacking(eid(1));
        c.set_stance(Stance::Hold);
        assert_eq!(c.state, CombatState::Idle);
    }
}
