//! Storage Sites (§4.I): per-site per-resource current/capacity/desired
//! accounting, with an alternate overlay for construction-in-progress sites.
//!
//! Grounded on `original_source/src/game/storage_site.h`'s public surface
//! (`IsSaturated`, `UpdateFaction`, `Desires`, `SetUseAlt`/`GetUseAlt`,
//! `SetAltCapacity`/`SetAltDesired`). The original keys resources by a C
//! string name (`rname`); this port keeps that as `String` since resource
//! identity is data-driven, not a fixed enum, in both versions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResourceAccount {
    current: i32,
    capacity: i32,
    desired: i32,
}

/// A storage site's resource ledger. `do_not_take*` flags make a site
/// ineligible as a transport *source* without affecting its capacity as a
/// destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSite {
    primary: HashMap<String, ResourceAccount>,
    alt: HashMap<String, ResourceAccount>,
    use_alt: bool,
    pub do_not_take: bool,
    pub do_not_take_land: bool,
    pub do_not_take_water: bool,
}

/// Outcome of [`StorageSite::set_curr`]: whether the amount actually
/// changed, for the caller to decide whether to fire
/// `STORAGE_SITE_AMOUNT_CHANGED`. Kept out of this module directly (like
/// [`crate::position_index::PositionIndex::set`]) so `StorageSite` stays
/// free of an event-bus dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCurrResult {
    pub old: i32,
    pub new: i32,
    pub changed: bool,
}

impl StorageSite {
    pub fn new() -> Self {
        Self::default()
    }

    fn overlay(&self, use_alt: bool) -> &HashMap<String, ResourceAccount> {
        if use_alt {
            &self.alt
        } else {
            &self.primary
        }
    }

    fn overlay_mut(&mut self, use_alt: bool) -> &mut HashMap<String, ResourceAccount> {
        if use_alt {
            &mut self.alt
        } else {
            &mut self.primary
        }
    }

    pub fn use_alt(&self) -> bool {
        self.use_alt
    }

    pub fn set_use_alt(&mut self, use_alt: bool) {
        self.use_alt = use_alt;
    }

    pub fn clear_alt(&mut self) {
        self.alt.clear();
    }

    pub fn clear_curr(&mut self) {
        for account in self.primary.values_mut() {
            account.current = 0;
        }
        for account in self.alt.values_mut() {
            account.current = 0;
        }
    }

    pub fn set_capacity(&mut self, rname: &str, capacity: i32) {
        self.overlay_mut(false)
            .entry(rname.to_owned())
            .or_default()
            .capacity = capacity.max(0);
    }

    pub fn set_desired(&mut self, rname: &str, desired: i32) {
        self.overlay_mut(false)
            .entry(rname.to_owned())
            .or_default()
            .desired = desired.max(0);
    }

    pub fn set_alt_capacity(&mut self, rname: &str, capacity: i32) {
        self.overlay_mut(true)
            .entry(rname.to_owned())
            .or_default()
            .capacity = capacity.max(0);
    }

    pub fn alt_capacity(&self, rname: &str) -> i32 {
        self.alt.get(rname).map_or(0, |a| a.capacity)
    }

    pub fn set_alt_desired(&mut self, rname: &str, desired: i32) {
        self.overlay_mut(true)
            .entry(rname.to_owned())
            .or_default()
            .desired = desired.max(0);
    }

    pub fn alt_desired(&self, rname: &str) -> i32 {
        self.alt.get(rname).map_or(0, |a| a.desired)
    }

    fn active_capacity(&self, rname: &str) -> i32 {
        self.overlay(self.use_alt).get(rname).map_or(0, |a| a.capacity)
    }

    pub fn desired(&self, rname: &str) -> i32 {
        self.overlay(self.use_alt).get(rname).map_or(0, |a| a.desired)
    }

    pub fn current(&self, rname: &str) -> i32 {
        self.overlay(self.use_alt).get(rname).map_or(0, |a| a.current)
    }

    /// Set the current amount of `rname`, clamped to `[0, active_capacity]`.
    pub fn set_curr(&mut self, rname: &str, n: i32) -> SetCurrResult {
        let active_capacity = self.active_capacity(rname);
        let use_alt = self.use_alt;
        let account = self.overlay_mut(use_alt).entry(rname.to_owned()).or_default();
        let old = account.current;
        let new = n.clamp(0, active_capacity);
        account.current = new;
        SetCurrResult {
            old,
            new,
            changed: old != new,
        }
    }

    /// A site is saturated for `rname` once `current >= desired` and
    /// `desired > 0` (per §3 DATA MODEL's saturation definition).
    pub fn is_saturated(&self, rname: &str) -> bool {
        let desired = self.desired(rname);
        desired > 0 && self.current(rname) >= desired
    }

    /// Whether this site is saturated for *any* tracked resource.
    pub fn is_saturated_any(&self) -> bool {
        self.overlay(self.use_alt)
            .keys()
            .any(|name| self.is_saturated(name))
    }

    /// Whether the site still wants more of `rname` (capacity allows it and
    /// it has not reached its desired amount).
    pub fn desires(&self, rname: &str) -> bool {
        self.active_capacity(rname) > self.current(rname) && self.desired(rname) > self.current(rname)
    }

    /// Reassigning the owning entity's faction (`EntityRegistry::faction_set`)
    /// calls this so every subsystem table is notified per §4.A, even though
    /// the ledger itself carries no per-faction state to remap -- unlike
    /// `original_source/src/game/building.c`'s `G_Building_UpdateFactionID`,
    /// this port has no navgrid blocker table keyed by faction to re-refcount.
    pub fn on_faction_changed(&mut self) {}

    /// Whether this site may act as a transport source for resources
    /// reachable from the given terrain (land/water), per the
    /// `do_not_take*` exclusion flags.
    pub fn eligible_as_source(&self, is_water: bool) -> bool {
        if self.do_not_take {
            return false;
        }
        if is_water && self.do_not_take_water {
            return false;
        }
        if !is_water && self.do_not_take_land {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_curr_clamps_to_capacity() {
        let mut site = StorageSite::new();
        site.set_capacity("wood", 100);
        let r = site.set_curr("wood", 150);
        assert_eq!(r.new, 100);
        assert!(r.changed);
    }

    #[test]
    fn set_curr_reports_unchanged_when_same() {
        let mut site = StorageSite::new();
        site.set_capacity("wood", 100);
        site.set_curr("wood", 50);
        let r = site.set_curr("wood", 50);
        assert!(!r.changed);
    }

    #[test]
    fn saturation_requires_positive_desired() {
        let mut site = StorageSite::new();
        site.set_capacity("wood", 100);
        site.set_curr("wood", 100);
        assert!(!site.is_saturated("wood"), "desired is 0, never saturated");
        site.set_desired("wood", 50);
        assert!(site.is_saturated("wood"));
    }

    #[test]
    fn alt_overlay_is_independent_of_primary() {
        let mut site = StorageSite::new();
        site.set_capacity("wood", 100);
        site.set_alt_capacity("wood", 10);
        site.set_use_alt(true);
        let r = site.set_curr("wood", 50);
        assert_eq!(r.new, 10, "clamped against alt capacity while use_alt");
        site.set_use_alt(false);
        assert_eq!(site.current("wood"), 0, "primary overlay untouched");
    }

    #[test]
    fn do_not_take_flags_exclude_as_source() {
        let mut site = StorageSite::new();
        assert!(site.eligible_as_source(false));
        site.do_not_take_land = true;
        assert!(!site.eligible_as_source(false));
        assert!(site.eligible_as_source(true));
        site.do_not_take = true;
        assert!(!site.eligible_as_source(true));
    }

    #[test]
    fn clear_curr_zeroes_both_overlays() {
        let mut site = StorageSite::new();
        site.set_capacity("wood", 100);
        site.set_curr("wood", 50);
        site.set_alt_capacity("wood", 100);
        site.set_use_alt(true);
        site.set_curr("wood", 20);
        site.clear_curr();
        site.set_use_alt(false);
        assert_eq!(site.current("wood"), 0);
        site.set_use_alt(true);
        assert_eq!(site.current("wood"), 0);
    }
}
