//! Resource pools: per-owner quantity stores.
//!
//! A [`ResourcePool`] maps resource ids to an amount and a per-resource gain
//! multiplier, plus a pool-wide global multiplier. Every mutation clamps
//! through the [`Resource`] bounds so an amount never leaves
//! `[min_value, max_value]`.
//!
//! Multipliers scale gains only: [`ResourcePool::add`] applies them, while
//! removals, transfers, and refunds move amounts unscaled.

use std::collections::BTreeMap;

use slotmap::SlotMap;

use crate::event::{EconomyEvent, EventKind, Observers};
use crate::id::PoolId;
use crate::resource::Resource;

/// Arena of pools addressed by [`PoolId`] handles. Producers and consumers
/// hold handles into it rather than owning pools.
pub type PoolArena = SlotMap<PoolId, ResourcePool>;

/// Stored state for one resource in a pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolEntry {
    pub amount: f64,
    pub multiplier: f64,
}

impl Default for PoolEntry {
    fn default() -> Self {
        Self {
            amount: 0.0,
            multiplier: 1.0,
        }
    }
}

/// A keyed store of resource amounts.
#[derive(Debug)]
pub struct ResourcePool {
    entries: BTreeMap<String, PoolEntry>,
    global_multiplier: f64,
    observers: Observers,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            global_multiplier: 1.0,
            observers: Observers::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current amount, or 0 if the resource has never been touched.
    pub fn get(&self, resource: &Resource) -> f64 {
        self.get_by_id(resource.id())
    }

    /// Current amount by resource id, or 0 if absent.
    pub fn get_by_id(&self, id: &str) -> f64 {
        self.entries.get(id).map(|e| e.amount).unwrap_or(0.0)
    }

    /// True iff removing `amount` would keep the pool at or above `min_value`.
    pub fn has(&self, resource: &Resource, amount: f64) -> bool {
        self.get(resource) - amount >= resource.min_value()
    }

    /// Whether the pool has an entry for this resource.
    pub fn contains(&self, resource: &Resource) -> bool {
        self.entries.contains_key(resource.id())
    }

    /// True when no entry holds a non-zero amount.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|e| e.amount == 0.0)
    }

    /// Number of resource entries (including zero-amount ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Ids of every resource with an entry, in id order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every entry, in id order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PoolEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy of the current `{resource id -> amount}` map.
    pub fn snapshot_amounts(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.amount))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Store `resource.clamp_amount(amount)`.
    pub fn set(&mut self, resource: &Resource, amount: f64) {
        let old = self.entry_mut(resource).amount;
        self.write(resource, old, resource.clamp_amount(amount));
    }

    /// Add `amount` scaled by `global_multiplier * per-resource multiplier`.
    ///
    /// Returns the delta actually applied, which may be less than requested
    /// when the result clamps at `max_value`.
    pub fn add(&mut self, resource: &Resource, amount: f64) -> f64 {
        debug_assert!(amount >= 0.0 || amount.is_nan(), "add() requires a non-negative amount");
        if amount.is_nan() || amount < 0.0 {
            return 0.0;
        }
        let global = self.global_multiplier;
        let entry = self.entry_mut(resource);
        let old = entry.amount;
        let effective = global * entry.multiplier;
        let new = resource.clamp_amount(old + amount * effective);
        self.write(resource, old, new);
        new - old
    }

    /// Remove exactly `amount`. Fails without mutating if the result would
    /// drop below `min_value`.
    pub fn remove(&mut self, resource: &Resource, amount: f64) -> bool {
        debug_assert!(amount >= 0.0 || amount.is_nan(), "remove() requires a non-negative amount");
        if !amount.is_finite() || amount < 0.0 {
            return false;
        }
        let old = self.get(resource);
        if old - amount < resource.min_value() {
            return false;
        }
        self.write(resource, old, resource.clamp_amount(old - amount));
        true
    }

    /// Remove up to `amount`, stopping at `min_value`. Returns the amount
    /// actually removed.
    pub fn remove_clamped(&mut self, resource: &Resource, amount: f64) -> f64 {
        debug_assert!(amount >= 0.0 || amount.is_nan(), "remove_clamped() requires a non-negative amount");
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let old = self.entry_mut(resource).amount;
        let new = (old - amount).max(resource.min_value()).min(old);
        let new = resource.clamp_amount(new);
        self.write(resource, old, new);
        (old - new).max(0.0)
    }

    /// Credit `amount` without applying multipliers. Used for transfers and
    /// refunds, where the amount already exists.
    pub(crate) fn credit_unscaled(&mut self, resource: &Resource, amount: f64) {
        let current = self.entry_mut(resource).amount;
        self.set(resource, current + amount);
    }

    /// Move `amount` from `source` to `dest` without multipliers.
    ///
    /// Fails without mutating either pool if the source lacks the amount.
    pub fn transfer(
        source: &mut ResourcePool,
        dest: &mut ResourcePool,
        resource: &Resource,
        amount: f64,
    ) -> bool {
        if !source.remove(resource, amount) {
            return false;
        }
        dest.credit_unscaled(resource, amount);
        true
    }

    /// Move everything above `min_value` from `source` to `dest`. Returns the
    /// amount transferred.
    pub fn transfer_all(source: &mut ResourcePool, dest: &mut ResourcePool, resource: &Resource) -> f64 {
        let old = source.get(resource);
        let min = resource.min_value();
        let available = old - min;
        if available.is_nan() || available <= 0.0 {
            return 0.0;
        }
        // Drain straight to the floor; `old - (old - min)` can round below it.
        source.write(resource, old, min);
        dest.credit_unscaled(resource, available);
        available
    }

    /// Remove every entry, announcing non-zero amounts as changed to 0.
    pub fn clear(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        for (id, entry) in entries {
            if entry.amount != 0.0 {
                self.observers.emit(EconomyEvent::ResourceChanged {
                    resource: id,
                    old: entry.amount,
                    new: 0.0,
                });
            }
        }
    }

    /// Remove one resource's entry (amount and multiplier).
    pub fn clear_resource(&mut self, resource: &Resource) {
        if let Some(entry) = self.entries.remove(resource.id())
            && entry.amount != 0.0
        {
            self.observers.emit(EconomyEvent::ResourceChanged {
                resource: resource.id().to_string(),
                old: entry.amount,
                new: 0.0,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Multipliers
    // -----------------------------------------------------------------------

    pub fn global_multiplier(&self) -> f64 {
        self.global_multiplier
    }

    pub fn set_global_multiplier(&mut self, multiplier: f64) {
        self.global_multiplier = multiplier;
    }

    /// Per-resource gain multiplier (1.0 if absent).
    pub fn multiplier(&self, resource: &Resource) -> f64 {
        self.entries
            .get(resource.id())
            .map(|e| e.multiplier)
            .unwrap_or(1.0)
    }

    pub fn set_multiplier(&mut self, resource: &Resource, multiplier: f64) {
        self.entry_mut(resource).multiplier = multiplier;
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut Observers {
        &mut self.observers
    }

    /// Register a listener for any event kind this pool emits.
    pub fn on_event(&mut self, kind: EventKind, listener: impl FnMut(&EconomyEvent) + 'static) {
        self.observers.subscribe(kind, Box::new(listener));
    }

    /// `listener(resource_id, old, new)` after every amount change.
    pub fn on_resource_changed(&mut self, mut listener: impl FnMut(&str, f64, f64) + 'static) {
        self.on_event(EventKind::ResourceChanged, move |e| {
            if let EconomyEvent::ResourceChanged { resource, old, new } = e {
                listener(resource, *old, *new);
            }
        });
    }

    /// `listener(resource_id)` when an amount falls to `min_value`.
    pub fn on_resource_depleted(&mut self, mut listener: impl FnMut(&str) + 'static) {
        self.on_event(EventKind::ResourceDepleted, move |e| {
            if let EconomyEvent::ResourceDepleted { resource } = e {
                listener(resource);
            }
        });
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn entry_mut(&mut self, resource: &Resource) -> &mut PoolEntry {
        self.entries.entry(resource.id().to_string()).or_default()
    }

    /// Store a pre-clamped amount and fire change/depletion notifications.
    fn write(&mut self, resource: &Resource, old: f64, new: f64) {
        self.entry_mut(resource).amount = new;
        if new == old {
            return;
        }
        self.observers.emit(EconomyEvent::ResourceChanged {
            resource: resource.id().to_string(),
            old,
            new,
        });
        let min = resource.min_value();
        if new <= min && old > min {
            self.observers.emit(EconomyEvent::ResourceDepleted {
                resource: resource.id().to_string(),
            });
        }
    }
}
