//! Resource Nodes (§4.H supplement): per-entity remaining-amount tracking,
//! exhaustion, and the "zombie" replenishing transition.
//!
//! Grounded on `original_source/src/game/resource.c`'s `struct rstate`
//! (`amount`/`restored_amount`/`replenishable`/`replenish_resources`/
//! `state`) and its `G_Resource_SetReplenishing`/`G_Resource_SetReplenished`
//! pair: an exhausted, replenishable node temporarily becomes a storage
//! site (if it wasn't already one) accepting the resources it lists in
//! `replenish_targets`, then snaps back to `restored_amount` once supplied.
//! `G_Resource_SetReplenishing` toggles [`StorageSite`]'s primary overlay
//! when the node wasn't already a storage site, or its alt overlay
//! (`SetUseAlt`/`SetAltCapacity`/`SetAltDesired`) when it was -- this port
//! keeps that same split rather than giving `ResourceNode` its own ledger.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::storage::StorageSite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ResourceState {
    Normal,
    Replenishing,
}

/// Outcome of [`ResourceNode::set_amount`], kept out of the struct's own
/// methods like [`crate::storage::SetCurrResult`] so this module stays free
/// of an event-bus dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountChangeResult {
    pub old: i32,
    pub new: i32,
    pub changed: bool,
    /// `true` the instant `new` first reaches zero from above.
    pub newly_exhausted: bool,
}

/// A harvestable resource node: a named, depletable amount, optionally
/// replenishable once exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub name: String,
    pub amount: i32,
    pub restored_amount: i32,
    pub replenishable: bool,
    /// Per-resource-type capacity/desired the node accepts while
    /// replenishing, keyed by resource name (mirrors `replenish_resources`).
    pub replenish_targets: HashMap<String, i32>,
    state: ResourceState,
}

impl ResourceNode {
    pub fn new(name: impl Into<String>, amount: i32) -> Self {
        Self {
            name: name.into(),
            amount,
            restored_amount: amount,
            replenishable: false,
            replenish_targets: HashMap::new(),
            state: ResourceState::Normal,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.amount <= 0
    }

    pub fn is_replenishing(&self) -> bool {
        self.state == ResourceState::Replenishing
    }

    /// Set the remaining amount, clamped at zero.
    pub fn set_amount(&mut self, amount: i32) -> AmountChangeResult {
        let old = self.amount;
        let new = amount.max(0);
        self.amount = new;
        AmountChangeResult {
            old,
            new,
            changed: old != new,
            newly_exhausted: old > 0 && new == 0,
        }
    }

    /// Deduct up to `requested` from the remaining amount. Returns the
    /// amount actually harvested (less than requested once the node nears
    /// exhaustion) and whether this call exhausted it.
    pub fn harvest(&mut self, requested: i32) -> AmountChangeResult {
        let taken = requested.min(self.amount.max(0));
        self.set_amount(self.amount - taken)
    }

    /// NORMAL -> REPLENISHING ("zombie"): the node becomes a storage site
    /// soliciting `replenish_targets`, using the alt overlay if `site` was
    /// already a storage site in its own right (so its primary ledger is
    /// left untouched) or the primary overlay otherwise.
    pub fn begin_replenishing(&mut self, site: &mut StorageSite, site_was_storage_site: bool) {
        debug_assert!(self.replenishable, "begin_replenishing requires replenishable == true");
        self.state = ResourceState::Replenishing;
        site.set_use_alt(site_was_storage_site);
        for (rname, amount) in &self.replenish_targets {
            if site_was_storage_site {
                site.set_alt_capacity(rname, *amount);
                site.set_alt_desired(rname, *amount);
            } else {
                site.set_capacity(rname, *amount);
                site.set_desired(rname, *amount);
            }
        }
    }

    /// REPLENISHING -> NORMAL: the solicited resources have been supplied;
    /// restore `amount` to `restored_amount` and hand the overlay back.
    pub fn end_replenishing(&mut self, site: &mut StorageSite, site_was_storage_site: bool) {
        self.state = ResourceState::Normal;
        if site_was_storage_site {
            site.clear_alt();
            site.set_use_alt(false);
        }
        self.amount = self.restored_amount;
    }

    /// Reassigning the owning entity's faction (`EntityRegistry::faction_set`)
    /// calls this so every subsystem table is notified per §4.A. The
    /// original's `G_Resource_UpdateFactionID` re-refcounts the node's
    /// navgrid blocker from the old faction to the new one; this port has
    /// no navgrid blocker table, so there is nothing for `ResourceNode`
    /// itself to remap.
    pub fn on_faction_changed(&mut self) {}
}
