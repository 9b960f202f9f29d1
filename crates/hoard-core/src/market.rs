//! Supply and demand price simulation.
//!
//! Each registered resource keeps decaying supply and demand accumulators.
//! Every tick the price drifts toward a target placed between its bounds by
//! the demand share, with a small random jitter:
//!
//! ```text
//! ratio  = demand / (supply + demand)          (target = base when both ~0)
//! target = min + ratio * (max - min)
//! target *= 1 + (rand - 0.5) * 2 * volatility * 0.1
//! price += (target - price) * price_speed * delta
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MarketConfig;
use crate::event::{EconomyEvent, EventKind, Observers};
use crate::pool::ResourcePool;
use crate::resource::Resource;
use crate::rng::SimRng;

/// Below this combined volume the market reverts to the base price.
const VOLUME_EPSILON: f64 = 1e-6;

/// Smallest price move reported as a change.
const PRICE_EPSILON: f64 = 1e-3;

/// Per-resource market state.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEntry {
    pub resource: Arc<Resource>,
    pub base_price: f64,
    pub current_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub supply: f64,
    pub demand: f64,
}

impl MarketEntry {
    fn clamp(&self, price: f64) -> f64 {
        price.clamp(self.min_price, self.max_price)
    }
}

/// A price board for a set of resources traded against a currency.
#[derive(Debug)]
pub struct Market {
    entries: BTreeMap<String, MarketEntry>,
    config: MarketConfig,
    rng: SimRng,
    observers: Observers,
}

impl Default for Market {
    fn default() -> Self {
        Self::new(MarketConfig::default())
    }
}

impl Market {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            entries: BTreeMap::new(),
            config: config.sanitized(),
            rng: SimRng::default(),
            observers: Observers::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SimRng::new(seed);
        self
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MarketConfig) {
        self.config = config.sanitized();
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Start pricing a resource. Reversed bounds are swapped and the base
    /// price is clamped into them. Re-registering resets the entry.
    ///
    /// Returns false, leaving any existing entry untouched, if either bound
    /// is NaN.
    pub fn register_resource(
        &mut self,
        resource: Arc<Resource>,
        base_price: f64,
        min_price: f64,
        max_price: f64,
    ) -> bool {
        if min_price.is_nan() || max_price.is_nan() {
            return false;
        }
        let (min_price, max_price) = if min_price <= max_price {
            (min_price, max_price)
        } else {
            (max_price, min_price)
        };
        let base_price = if base_price.is_nan() {
            min_price
        } else {
            base_price.clamp(min_price, max_price)
        };
        self.entries.insert(
            resource.id().to_string(),
            MarketEntry {
                resource,
                base_price,
                current_price: base_price,
                min_price,
                max_price,
                supply: 0.0,
                demand: 0.0,
            },
        );
        true
    }

    pub fn unregister_resource(&mut self, resource_id: &str) -> bool {
        self.entries.remove(resource_id).is_some()
    }

    pub fn is_registered(&self, resource_id: &str) -> bool {
        self.entries.contains_key(resource_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, resource_id: &str) -> Option<&MarketEntry> {
        self.entries.get(resource_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MarketEntry> {
        self.entries.values()
    }

    // -----------------------------------------------------------------------
    // Prices
    // -----------------------------------------------------------------------

    /// Current price, 0 for unregistered resources.
    pub fn price(&self, resource_id: &str) -> f64 {
        self.entries.get(resource_id).map_or(0.0, |e| e.current_price)
    }

    pub fn base_price(&self, resource_id: &str) -> f64 {
        self.entries.get(resource_id).map_or(0.0, |e| e.base_price)
    }

    /// Change the base price, clamped into the entry's bounds.
    pub fn set_base_price(&mut self, resource_id: &str, price: f64) -> bool {
        let Some(entry) = self.entries.get_mut(resource_id) else {
            return false;
        };
        if price.is_nan() {
            return false;
        }
        entry.base_price = entry.clamp(price);
        true
    }

    pub fn buy_price(&self, resource_id: &str) -> f64 {
        self.price(resource_id) * self.config.buy_markup
    }

    pub fn sell_price(&self, resource_id: &str) -> f64 {
        self.price(resource_id) * self.config.sell_markdown
    }

    pub fn supply(&self, resource_id: &str) -> f64 {
        self.entries.get(resource_id).map_or(0.0, |e| e.supply)
    }

    pub fn demand(&self, resource_id: &str) -> f64 {
        self.entries.get(resource_id).map_or(0.0, |e| e.demand)
    }

    /// Record external supply (e.g. NPC sales). Ignores non-positive amounts.
    pub fn add_supply(&mut self, resource_id: &str, amount: f64) {
        if let Some(entry) = self.entries.get_mut(resource_id)
            && amount > 0.0
        {
            entry.supply += amount;
        }
    }

    /// Record external demand. Ignores non-positive amounts.
    pub fn add_demand(&mut self, resource_id: &str, amount: f64) {
        if let Some(entry) = self.entries.get_mut(resource_id)
            && amount > 0.0
        {
            entry.demand += amount;
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Move every price toward its supply/demand target and decay volumes.
    pub fn update(&mut self, delta: f64) {
        let cfg = self.config;
        let decay = (1.0 - cfg.supply_decay * delta).max(0.0);
        let mut changes = Vec::new();

        for (id, entry) in &mut self.entries {
            let volume = entry.supply + entry.demand;
            let mut target = if volume > VOLUME_EPSILON {
                let ratio = entry.demand / volume;
                entry.min_price + ratio * (entry.max_price - entry.min_price)
            } else {
                entry.base_price
            };

            let jitter = (self.rng.next_f64() - 0.5) * 2.0 * cfg.volatility * 0.1;
            target = entry.clamp(target * (1.0 + jitter));

            let old = entry.current_price;
            let moved = old + (target - old) * cfg.price_speed * delta;
            entry.current_price = if moved.is_finite() { entry.clamp(moved) } else { old };

            entry.supply *= decay;
            entry.demand *= decay;

            if (entry.current_price - old).abs() > PRICE_EPSILON {
                changes.push(EconomyEvent::PriceChanged {
                    resource: id.clone(),
                    old,
                    new: entry.current_price,
                });
            }
        }

        for event in changes {
            self.observers.emit(event);
        }
    }

    /// Snap every price back to its base.
    pub fn reset_prices(&mut self) {
        let mut changes = Vec::new();
        for (id, entry) in &mut self.entries {
            let old = entry.current_price;
            entry.current_price = entry.base_price;
            if old != entry.base_price {
                changes.push(EconomyEvent::PriceChanged {
                    resource: id.clone(),
                    old,
                    new: entry.base_price,
                });
            }
        }
        for event in changes {
            self.observers.emit(event);
        }
    }

    pub fn clear_supply_demand(&mut self) {
        for entry in self.entries.values_mut() {
            entry.supply = 0.0;
            entry.demand = 0.0;
        }
    }

    // -----------------------------------------------------------------------
    // Trading
    // -----------------------------------------------------------------------

    /// Buy `amount` of `resource` for `currency` out of `pool`.
    ///
    /// Fails without touching the pool when the resource is unregistered,
    /// the amount is not positive, or the pool cannot cover the cost.
    pub fn buy(
        &mut self,
        resource: &Resource,
        amount: f64,
        currency: &Resource,
        pool: &mut ResourcePool,
    ) -> bool {
        if !(amount.is_finite() && amount > 0.0) {
            return false;
        }
        let Some(entry) = self.entries.get_mut(resource.id()) else {
            return false;
        };
        let cost = entry.current_price * self.config.buy_markup * amount;
        if !pool.has(currency, cost) || !pool.remove(currency, cost) {
            return false;
        }
        pool.add(resource, amount);
        entry.demand += amount;
        tracing::debug!(resource = resource.id(), amount, cost, "market buy");
        true
    }

    /// Sell `amount` of `resource` from `pool` for `currency`.
    pub fn sell(
        &mut self,
        resource: &Resource,
        amount: f64,
        currency: &Resource,
        pool: &mut ResourcePool,
    ) -> bool {
        if !(amount.is_finite() && amount > 0.0) {
            return false;
        }
        let Some(entry) = self.entries.get_mut(resource.id()) else {
            return false;
        };
        if !pool.has(resource, amount) || !pool.remove(resource, amount) {
            return false;
        }
        let revenue = entry.current_price * amount * self.config.sell_markdown;
        pool.add(currency, revenue);
        entry.supply += amount;
        tracing::debug!(resource = resource.id(), amount, revenue, "market sell");
        true
    }

    // -----------------------------------------------------------------------
    // Persistence helpers
    // -----------------------------------------------------------------------

    /// Overwrite the live state of an entry. Price is clamped into bounds;
    /// negative volumes become 0.
    pub fn restore_entry(&mut self, resource_id: &str, price: f64, supply: f64, demand: f64) -> bool {
        let Some(entry) = self.entries.get_mut(resource_id) else {
            return false;
        };
        if price.is_finite() {
            entry.current_price = entry.clamp(price);
        }
        entry.supply = if supply.is_finite() { supply.max(0.0) } else { 0.0 };
        entry.demand = if demand.is_finite() { demand.max(0.0) } else { 0.0 };
        true
    }

    pub fn rng(&self) -> &SimRng {
        &self.rng
    }

    pub fn set_rng(&mut self, rng: SimRng) {
        self.rng = rng;
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn observers_mut(&mut self) -> &mut Observers {
        &mut self.observers
    }

    pub fn on_event(&mut self, kind: EventKind, listener: impl FnMut(&EconomyEvent) + 'static) {
        self.observers.subscribe(kind, Box::new(listener));
    }

    /// `listener(resource_id, old, new)` on every reported price move.
    pub fn on_price_changed(&mut self, mut listener: impl FnMut(&str, f64, f64) + 'static) {
        self.on_event(EventKind::PriceChanged, move |e| {
            if let EconomyEvent::PriceChanged { resource, old, new } = e {
                listener(resource, *old, *new);
            }
        });
    }
}

// ===========================================================================
// Tests
// ===========================================================================
