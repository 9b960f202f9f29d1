//! Continuous consumption with starvation tracking.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::event::{EconomyEvent, EventKind, Observers};
use crate::id::PoolId;
use crate::pool::PoolArena;
use crate::resource::Resource;

/// A per-second draw on one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub resource: Arc<Resource>,
    /// Units per second before the consumer's rate multiplier.
    pub rate: f64,
    /// Whether the last tick failed to cover this requirement in full.
    pub starved: bool,
}

/// Drains resources from a pool every tick and reports when it cannot.
#[derive(Debug)]
pub struct Consumer {
    pool: Option<PoolId>,
    requirements: BTreeMap<String, Requirement>,
    rate_multiplier: f64,
    active: bool,
    is_starved: bool,
    observers: Observers,
}

impl Default for Consumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer {
    pub fn new() -> Self {
        Self {
            pool: None,
            requirements: BTreeMap::new(),
            rate_multiplier: 1.0,
            active: true,
            is_starved: false,
            observers: Observers::new(),
        }
    }

    pub fn with_pool(mut self, pool: PoolId) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_requirement(mut self, resource: Arc<Resource>, rate: f64) -> Self {
        self.add_requirement(resource, rate);
        self
    }

    pub fn with_rate_multiplier(mut self, multiplier: f64) -> Self {
        self.set_rate_multiplier(multiplier);
        self
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    pub fn set_pool(&mut self, pool: Option<PoolId>) {
        self.pool = pool;
    }

    /// Add or replace the requirement for a resource. Replacing keeps the
    /// starved flag. Negative and NaN rates are ignored.
    pub fn add_requirement(&mut self, resource: Arc<Resource>, rate: f64) {
        debug_assert!(rate >= 0.0, "consumption rate must be non-negative");
        if rate.is_nan() || rate < 0.0 {
            return;
        }
        let starved = self
            .requirements
            .get(resource.id())
            .is_some_and(|r| r.starved);
        self.requirements.insert(
            resource.id().to_string(),
            Requirement {
                resource,
                rate,
                starved,
            },
        );
    }

    /// Remove a requirement. The aggregate starved flag is recomputed but no
    /// notification fires.
    pub fn remove_requirement(&mut self, resource_id: &str) -> bool {
        let removed = self.requirements.remove(resource_id).is_some();
        if removed {
            self.is_starved = self.requirements.values().any(|r| r.starved);
        }
        removed
    }

    pub fn requirement_count(&self) -> usize {
        self.requirements.len()
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.values()
    }

    /// Base rate for a resource, 0 if not required.
    pub fn rate(&self, resource_id: &str) -> f64 {
        self.requirements.get(resource_id).map_or(0.0, |r| r.rate)
    }

    pub fn rate_multiplier(&self) -> f64 {
        self.rate_multiplier
    }

    pub fn set_rate_multiplier(&mut self, multiplier: f64) {
        debug_assert!(multiplier >= 0.0, "rate multiplier must be non-negative");
        self.rate_multiplier = if multiplier.is_nan() { 0.0 } else { multiplier.max(0.0) };
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_starved(&self) -> bool {
        self.is_starved
    }

    pub fn is_resource_starved(&self, resource_id: &str) -> bool {
        self.requirements.get(resource_id).is_some_and(|r| r.starved)
    }

    /// Fraction of requirements met on the last tick; 1.0 with none.
    pub fn satisfaction(&self) -> f64 {
        if self.requirements.is_empty() {
            return 1.0;
        }
        let met = self.requirements.values().filter(|r| !r.starved).count();
        met as f64 / self.requirements.len() as f64
    }

    /// Seconds until the pool runs out of `resource_id` at the current rate.
    /// Infinite when inactive, unpooled, unrequired, or at zero rate.
    pub fn time_until_starved(&self, resource_id: &str, pools: &PoolArena) -> f64 {
        if !self.active {
            return f64::INFINITY;
        }
        let Some(pool) = self.pool.and_then(|id| pools.get(id)) else {
            return f64::INFINITY;
        };
        let Some(req) = self.requirements.get(resource_id) else {
            return f64::INFINITY;
        };
        let per_second = req.rate * self.rate_multiplier;
        if per_second <= 0.0 {
            return f64::INFINITY;
        }
        let available = (pool.get(&req.resource) - req.resource.min_value()).max(0.0);
        available / per_second
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Consume `rate * rate_multiplier * delta` of every requirement.
    ///
    /// A requirement that cannot be met takes whatever is left and is marked
    /// starved. Each requirement is processed independently.
    pub fn update(&mut self, delta: f64, pools: &mut PoolArena) {
        if !self.active {
            return;
        }
        let Some(pool) = self.pool.and_then(|id| pools.get_mut(id)) else {
            return;
        };

        let mut newly_starved = Vec::new();
        for (id, req) in &mut self.requirements {
            let needed = req.rate * self.rate_multiplier * delta;
            if needed <= 0.0 || pool.remove(&req.resource, needed) {
                req.starved = false;
                continue;
            }
            pool.remove_clamped(&req.resource, needed);
            if !req.starved {
                req.starved = true;
                newly_starved.push(id.clone());
            }
        }

        for resource in newly_starved {
            tracing::debug!(resource = %resource, "consumer starved");
            self.observers.emit(EconomyEvent::ResourceStarved { resource });
        }

        let was_starved = self.is_starved;
        self.is_starved = self.requirements.values().any(|r| r.starved);
        if was_starved && !self.is_starved {
            tracing::debug!("consumer satisfied");
            self.observers.emit(EconomyEvent::ConsumerSatisfied);
        }
    }

    /// Restore per-requirement starved flags from a save. Unknown ids are
    /// ignored.
    pub fn restore_starved(&mut self, starved: &[String]) {
        for req in self.requirements.values_mut() {
            req.starved = starved.iter().any(|id| id == req.resource.id());
        }
        self.is_starved = self.requirements.values().any(|r| r.starved);
    }

    /// Ids of the requirements currently starved.
    pub fn starved_resources(&self) -> Vec<String> {
        self.requirements
            .iter()
            .filter(|(_, r)| r.starved)
            .map(|(id, _)| id.clone())
            .collect()
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

    pub fn on_starved(&mut self, mut listener: impl FnMut(&str) + 'static) {
        self.on_event(EventKind::ResourceStarved, move |e| {
            if let EconomyEvent::ResourceStarved { resource } = e {
                listener(resource);
            }
        });
    }

    pub fn on_satisfied(&mut self, mut listener: impl FnMut() + 'static) {
        self.on_event(EventKind::ConsumerSatisfied, move |_| listener());
    }
}

// ===========================================================================
// Tests
// ===========================================================================
