//! Save-game contract: plain serde data captured from and restored into the
//! live components.
//!
//! No file format is chosen here; callers serialize [`EconomyState`] with
//! whatever serde backend their save system uses. Component handles are
//! slotmap keys, so a restore targets an economy rebuilt with the same
//! pools, producers, consumers and markets in the same order.
//!
//! Restoring validates everything first and then applies, so a rejected
//! state leaves the economy untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::consumer::Consumer;
use crate::economy::Economy;
use crate::id::{ConsumerId, MarketId, PoolId, ProducerId};
use crate::market::Market;
use crate::pool::ResourcePool;
use crate::producer::{ProductionState, Producer};
use crate::registry::Registry;
use crate::rng::SimRng;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("unknown resource '{0}' in saved state")]
    UnknownResource(String),
    #[error("unknown recipe '{0}' in saved state")]
    UnknownRecipe(String),
    #[error("saved {kind} has no live counterpart")]
    MissingComponent { kind: &'static str },
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolState {
    pub amounts: BTreeMap<String, f64>,
    /// Only multipliers that differ from 1.
    #[serde(default)]
    pub multipliers: BTreeMap<String, f64>,
    #[serde(default = "one")]
    pub global_multiplier: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducerState {
    pub recipe_id: Option<String>,
    pub is_producing: bool,
    pub elapsed_time: f64,
    #[serde(default)]
    pub inputs_consumed: bool,
    /// Output-chance stream, so chance rolls continue where they left off.
    pub rng: SimRng,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerState {
    pub active: bool,
    pub starved: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketEntryState {
    pub current_price: f64,
    pub supply: f64,
    pub demand: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub entries: BTreeMap<String, MarketEntryState>,
    pub rng: SimRng,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OfflineState {
    /// Unix seconds; 0 means no snapshot.
    pub snapshot_time: u64,
}

/// Everything needed to resume an economy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconomyState {
    pub tick: u64,
    pub paused: bool,
    pub pools: SecondaryMap<PoolId, PoolState>,
    pub producers: SecondaryMap<ProducerId, ProducerState>,
    pub consumers: SecondaryMap<ConsumerId, ConsumerState>,
    pub markets: SecondaryMap<MarketId, MarketState>,
    pub offline: OfflineState,
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

impl ResourcePool {
    pub fn capture_state(&self) -> PoolState {
        PoolState {
            amounts: self.snapshot_amounts(),
            multipliers: self
                .entries()
                .filter(|(_, e)| e.multiplier != 1.0)
                .map(|(id, e)| (id.to_string(), e.multiplier))
                .collect(),
            global_multiplier: self.global_multiplier(),
        }
    }

    fn check_state(state: &PoolState, registry: &Registry) -> Result<(), StateError> {
        for id in state.amounts.keys().chain(state.multipliers.keys()) {
            if registry.resource(id).is_none() {
                return Err(StateError::UnknownResource(id.clone()));
            }
        }
        Ok(())
    }

    /// Replace the pool contents. Amounts are clamped through each
    /// resource; change notifications fire as for [`ResourcePool::set`].
    pub fn restore_state(&mut self, state: &PoolState, registry: &Registry) -> Result<(), StateError> {
        Self::check_state(state, registry)?;
        self.apply_state(state, registry);
        Ok(())
    }

    fn apply_state(&mut self, state: &PoolState, registry: &Registry) {
        let stale: Vec<String> = self
            .resources()
            .filter(|id| !state.amounts.contains_key(*id))
            .map(str::to_string)
            .collect();
        for id in stale {
            if let Some(resource) = registry.resource(&id) {
                self.clear_resource(resource);
            }
        }

        self.set_global_multiplier(state.global_multiplier);
        for resource in registry.resources() {
            let multiplier = state.multipliers.get(resource.id()).copied();
            if let Some(m) = multiplier {
                self.set_multiplier(resource, m);
            } else if self.contains(resource) {
                self.set_multiplier(resource, 1.0);
            }
            if let Some(amount) = state.amounts.get(resource.id()) {
                self.set(resource, *amount);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

impl Producer {
    pub fn capture_state(&self) -> ProducerState {
        let state = self.state();
        ProducerState {
            recipe_id: self.recipe().map(|r| r.id().to_string()),
            is_producing: state.is_producing,
            elapsed_time: state.elapsed_time,
            inputs_consumed: state.inputs_consumed,
            rng: self.rng().clone(),
        }
    }

    fn check_state(state: &ProducerState, registry: &Registry) -> Result<(), StateError> {
        match &state.recipe_id {
            Some(id) if registry.recipe(id).is_none() => Err(StateError::UnknownRecipe(id.clone())),
            _ => Ok(()),
        }
    }

    /// Point the producer at the saved recipe and resume its cycle. Pools
    /// are not touched.
    pub fn restore_state(
        &mut self,
        state: &ProducerState,
        registry: &Registry,
    ) -> Result<(), StateError> {
        Self::check_state(state, registry)?;
        self.apply_state(state, registry);
        Ok(())
    }

    fn apply_state(&mut self, state: &ProducerState, registry: &Registry) {
        let recipe = state
            .recipe_id
            .as_deref()
            .and_then(|id| registry.recipe(id))
            .cloned();
        self.set_recipe(recipe);
        self.restore_production(ProductionState {
            is_producing: state.is_producing,
            elapsed_time: state.elapsed_time.max(0.0),
            inputs_consumed: state.inputs_consumed,
        });
        self.set_rng(state.rng.clone());
    }
}

// ---------------------------------------------------------------------------
// Consumers and markets
// ---------------------------------------------------------------------------

impl Consumer {
    pub fn capture_state(&self) -> ConsumerState {
        ConsumerState {
            active: self.is_active(),
            starved: self.starved_resources(),
        }
    }

    pub fn restore_state(&mut self, state: &ConsumerState) {
        self.set_active(state.active);
        self.restore_starved(&state.starved);
    }
}

impl Market {
    pub fn capture_state(&self) -> MarketState {
        MarketState {
            entries: self
                .entries()
                .map(|e| {
                    (
                        e.resource.id().to_string(),
                        MarketEntryState {
                            current_price: e.current_price,
                            supply: e.supply,
                            demand: e.demand,
                        },
                    )
                })
                .collect(),
            rng: self.rng().clone(),
        }
    }

    /// Restore prices and volumes of registered resources. Entries for
    /// resources this market does not price are ignored.
    pub fn restore_state(&mut self, state: &MarketState) {
        for (id, entry) in &state.entries {
            self.restore_entry(id, entry.current_price, entry.supply, entry.demand);
        }
        self.set_rng(state.rng.clone());
    }
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

impl Economy {
    /// Capture the complete runtime state.
    pub fn capture_state(&self) -> EconomyState {
        let mut state = EconomyState {
            tick: self.tick,
            paused: self.paused,
            offline: OfflineState {
                snapshot_time: self.offline.snapshot_time(),
            },
            ..EconomyState::default()
        };
        for (id, pool) in &self.pools {
            state.pools.insert(id, pool.capture_state());
        }
        for (id, producer) in &self.producers {
            state.producers.insert(id, producer.capture_state());
        }
        for (id, consumer) in &self.consumers {
            state.consumers.insert(id, consumer.capture_state());
        }
        for (id, market) in &self.markets {
            state.markets.insert(id, market.capture_state());
        }
        state
    }

    /// Restore a captured state. Fails without changes when the state names
    /// a component, resource, or recipe this economy does not have.
    pub fn restore_state(&mut self, state: &EconomyState) -> Result<(), StateError> {
        let registry = self.registry().clone();

        for (id, pool) in &state.pools {
            if !self.pools.contains_key(id) {
                return Err(StateError::MissingComponent { kind: "pool" });
            }
            ResourcePool::check_state(pool, &registry)?;
        }
        for (id, producer) in &state.producers {
            if !self.producers.contains_key(id) {
                return Err(StateError::MissingComponent { kind: "producer" });
            }
            Producer::check_state(producer, &registry)?;
        }
        if state.consumers.keys().any(|id| !self.consumers.contains_key(id)) {
            return Err(StateError::MissingComponent { kind: "consumer" });
        }
        if state.markets.keys().any(|id| !self.markets.contains_key(id)) {
            return Err(StateError::MissingComponent { kind: "market" });
        }

        for (id, saved) in &state.pools {
            if let Some(pool) = self.pools.get_mut(id) {
                pool.apply_state(saved, &registry);
            }
        }
        for (id, saved) in &state.producers {
            if let Some(producer) = self.producers.get_mut(id) {
                producer.apply_state(saved, &registry);
            }
        }
        for (id, saved) in &state.consumers {
            if let Some(consumer) = self.consumers.get_mut(id) {
                consumer.restore_state(saved);
            }
        }
        for (id, saved) in &state.markets {
            if let Some(market) = self.markets.get_mut(id) {
                market.restore_state(saved);
            }
        }
        self.offline.set_snapshot_time(state.offline.snapshot_time);
        self.tick = state.tick;
        self.paused = state.paused;

        tracing::debug!(
            tick = state.tick,
            pools = state.pools.len(),
            producers = state.producers.len(),
            "economy state restored"
        );
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
