//! The economy: owns every pool and component and advances them together.
//!
//! # Architecture
//!
//! The `Economy` owns:
//! - A frozen [`Registry`] of resources and recipes, shared via `Arc`
//! - Arenas of [`ResourcePool`], [`Producer`], [`Consumer`] and [`Market`],
//!   addressed by slotmap handles
//! - An [`OfflineCalculator`] tracking a subset of the producers
//! - A paused flag and tick counter
//!
//! Components never own pools. Producers and consumers hold [`PoolId`]
//! handles, and trades and transfers are routed through the economy, which
//! resolves handles and resource ids before delegating.
//!
//! # Step Order
//!
//! Each `step(delta)` runs:
//! 1. **Producers** -- advance timers, complete and restart cycles
//! 2. **Consumers** -- drain requirements, track starvation
//! 3. **Markets** -- move prices, decay supply and demand
//! 4. **Bookkeeping** -- increment the tick counter

use std::sync::Arc;

use slotmap::SlotMap;

use crate::config::EconomyConfig;
use crate::consumer::Consumer;
use crate::id::{ConsumerId, MarketId, PoolId, ProducerId};
use crate::market::Market;
use crate::offline::{Clock, OfflineCalculator, OfflineProgress};
use crate::pool::{PoolArena, ResourcePool};
use crate::producer::{Producer, ProducerArena};
use crate::recipe::ProductionRecipe;
use crate::registry::Registry;
use crate::resource::Resource;
use crate::rng::SimRng;

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Economy {
    registry: Arc<Registry>,
    config: EconomyConfig,

    pub(crate) pools: PoolArena,
    pub(crate) producers: ProducerArena,
    pub(crate) consumers: SlotMap<ConsumerId, Consumer>,
    pub(crate) markets: SlotMap<MarketId, Market>,
    pub(crate) offline: OfflineCalculator,

    /// Hands out per-component seeds.
    seeder: SimRng,
    pub(crate) paused: bool,
    pub(crate) tick: u64,
}

impl Economy {
    pub fn new(registry: Arc<Registry>, config: EconomyConfig) -> Self {
        let config = config.sanitized();
        Self {
            registry,
            config,
            pools: PoolArena::with_key(),
            producers: ProducerArena::with_key(),
            consumers: SlotMap::with_key(),
            markets: SlotMap::with_key(),
            offline: OfflineCalculator::new(config.offline),
            seeder: SimRng::new(config.seed),
            paused: false,
            tick: 0,
        }
    }

    /// Replace the wall clock used for offline snapshots.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        let offline = std::mem::take(&mut self.offline);
        self.offline = offline.with_clock(clock);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn resource(&self, id: &str) -> Option<&Arc<Resource>> {
        self.registry.resource(id)
    }

    pub fn recipe(&self, id: &str) -> Option<&Arc<ProductionRecipe>> {
        self.registry.recipe(id)
    }

    // -----------------------------------------------------------------------
    // Pools
    // -----------------------------------------------------------------------

    pub fn add_pool(&mut self, pool: ResourcePool) -> PoolId {
        self.pools.insert(pool)
    }

    /// Remove a pool. Components still pointing at it become inert.
    pub fn remove_pool(&mut self, id: PoolId) -> Option<ResourcePool> {
        self.pools.remove(id)
    }

    pub fn pool(&self, id: PoolId) -> Option<&ResourcePool> {
        self.pools.get(id)
    }

    pub fn pool_mut(&mut self, id: PoolId) -> Option<&mut ResourcePool> {
        self.pools.get_mut(id)
    }

    pub fn pools(&self) -> &PoolArena {
        &self.pools
    }

    /// Amount of `resource_id` in a pool; 0 for unknown pools or resources.
    pub fn amount(&self, pool: PoolId, resource_id: &str) -> f64 {
        self.pools.get(pool).map_or(0.0, |p| p.get_by_id(resource_id))
    }

    // -----------------------------------------------------------------------
    // Producers
    // -----------------------------------------------------------------------

    /// Take ownership of a producer. Its RNG is reseeded from the economy
    /// seed.
    pub fn add_producer(&mut self, mut producer: Producer) -> ProducerId {
        producer.set_seed(self.seeder.next_u64());
        self.producers.insert(producer)
    }

    /// Remove a producer and stop tracking it offline. Consumed inputs of a
    /// running cycle are not refunded; cancel first to get them back.
    pub fn remove_producer(&mut self, id: ProducerId) -> Option<Producer> {
        self.offline.remove_producer(id);
        self.producers.remove(id)
    }

    pub fn producer(&self, id: ProducerId) -> Option<&Producer> {
        self.producers.get(id)
    }

    pub fn producer_mut(&mut self, id: ProducerId) -> Option<&mut Producer> {
        self.producers.get_mut(id)
    }

    pub fn producers(&self) -> &ProducerArena {
        &self.producers
    }

    pub fn start_producer(&mut self, id: ProducerId) -> bool {
        match self.producers.get_mut(id) {
            Some(producer) => producer.start(&mut self.pools),
            None => false,
        }
    }

    pub fn cancel_producer(&mut self, id: ProducerId) -> bool {
        match self.producers.get_mut(id) {
            Some(producer) => producer.cancel(&mut self.pools),
            None => false,
        }
    }

    pub fn complete_producer(&mut self, id: ProducerId) -> bool {
        match self.producers.get_mut(id) {
            Some(producer) => producer.complete_immediately(&mut self.pools),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Consumers
    // -----------------------------------------------------------------------

    pub fn add_consumer(&mut self, consumer: Consumer) -> ConsumerId {
        self.consumers.insert(consumer)
    }

    pub fn remove_consumer(&mut self, id: ConsumerId) -> Option<Consumer> {
        self.consumers.remove(id)
    }

    pub fn consumer(&self, id: ConsumerId) -> Option<&Consumer> {
        self.consumers.get(id)
    }

    pub fn consumer_mut(&mut self, id: ConsumerId) -> Option<&mut Consumer> {
        self.consumers.get_mut(id)
    }

    pub fn time_until_starved(&self, id: ConsumerId, resource_id: &str) -> f64 {
        self.consumers
            .get(id)
            .map_or(f64::INFINITY, |c| c.time_until_starved(resource_id, &self.pools))
    }

    // -----------------------------------------------------------------------
    // Markets
    // -----------------------------------------------------------------------

    /// Create an empty market using the economy's market config.
    pub fn create_market(&mut self) -> MarketId {
        let market = Market::new(self.config.market);
        self.add_market(market)
    }

    /// Take ownership of a market. Its RNG is reseeded from the economy seed.
    pub fn add_market(&mut self, mut market: Market) -> MarketId {
        market.set_rng(SimRng::new(self.seeder.next_u64()));
        self.markets.insert(market)
    }

    pub fn remove_market(&mut self, id: MarketId) -> Option<Market> {
        self.markets.remove(id)
    }

    pub fn market(&self, id: MarketId) -> Option<&Market> {
        self.markets.get(id)
    }

    pub fn market_mut(&mut self, id: MarketId) -> Option<&mut Market> {
        self.markets.get_mut(id)
    }

    /// Buy `amount` of `resource_id` in `market`, paying `currency_id` from
    /// `pool`.
    pub fn buy(
        &mut self,
        market: MarketId,
        pool: PoolId,
        resource_id: &str,
        amount: f64,
        currency_id: &str,
    ) -> bool {
        let (Some(resource), Some(currency)) = (
            self.registry.resource(resource_id),
            self.registry.resource(currency_id),
        ) else {
            return false;
        };
        let (Some(market), Some(pool)) = (self.markets.get_mut(market), self.pools.get_mut(pool))
        else {
            return false;
        };
        market.buy(resource, amount, currency, pool)
    }

    /// Sell `amount` of `resource_id` from `pool` into `market` for
    /// `currency_id`.
    pub fn sell(
        &mut self,
        market: MarketId,
        pool: PoolId,
        resource_id: &str,
        amount: f64,
        currency_id: &str,
    ) -> bool {
        let (Some(resource), Some(currency)) = (
            self.registry.resource(resource_id),
            self.registry.resource(currency_id),
        ) else {
            return false;
        };
        let (Some(market), Some(pool)) = (self.markets.get_mut(market), self.pools.get_mut(pool))
        else {
            return false;
        };
        market.sell(resource, amount, currency, pool)
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    /// Move exactly `amount` between two distinct pools, or nothing.
    pub fn transfer(&mut self, source: PoolId, dest: PoolId, resource_id: &str, amount: f64) -> bool {
        let Some(resource) = self.registry.resource(resource_id) else {
            return false;
        };
        let Some([src, dst]) = self.pools.get_disjoint_mut([source, dest]) else {
            return false;
        };
        ResourcePool::transfer(src, dst, resource, amount)
    }

    /// Move everything above the resource minimum. Returns the amount moved.
    pub fn transfer_all(&mut self, source: PoolId, dest: PoolId, resource_id: &str) -> f64 {
        let Some(resource) = self.registry.resource(resource_id) else {
            return 0.0;
        };
        let Some([src, dst]) = self.pools.get_disjoint_mut([source, dest]) else {
            return 0.0;
        };
        ResourcePool::transfer_all(src, dst, resource)
    }

    // -----------------------------------------------------------------------
    // Offline
    // -----------------------------------------------------------------------

    /// Include a producer in offline catch-up. Unknown handles are refused.
    pub fn track_producer(&mut self, id: ProducerId) -> bool {
        self.producers.contains_key(id) && self.offline.add_producer(id)
    }

    pub fn untrack_producer(&mut self, id: ProducerId) -> bool {
        self.offline.remove_producer(id)
    }

    pub fn offline(&self) -> &OfflineCalculator {
        &self.offline
    }

    pub fn offline_mut(&mut self) -> &mut OfflineCalculator {
        &mut self.offline
    }

    pub fn take_offline_snapshot(&mut self) {
        self.offline.take_snapshot();
    }

    /// Preview what [`apply_offline`](Self::apply_offline) would credit.
    pub fn offline_progress(&self) -> OfflineProgress {
        self.offline.calculate_progress(&self.producers)
    }

    /// Credit offline progress to `pool` and clear the snapshot. Returns the
    /// simulated seconds.
    pub fn apply_offline(&mut self, pool: PoolId) -> f64 {
        let Some(target) = self.pools.get_mut(pool) else {
            tracing::warn!(?pool, "offline progress target pool missing");
            return 0.0;
        };
        let duration = self.offline.apply(&self.producers, target);
        if duration > 0.0 {
            self.offline.clear_snapshot();
        }
        duration
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Pause the economy. While paused, `step()` is a no-op; direct
    /// operations (trades, transfers, starts) still work.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of steps run since creation.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance every component by `delta` seconds.
    pub fn step(&mut self, delta: f64) {
        if self.paused {
            return;
        }
        debug_assert!(delta >= 0.0, "step() requires a non-negative delta");
        if delta.is_nan() || delta < 0.0 {
            return;
        }

        for producer in self.producers.values_mut() {
            producer.update(delta, &mut self.pools);
        }
        for consumer in self.consumers.values_mut() {
            consumer.update(delta, &mut self.pools);
        }
        for market in self.markets.values_mut() {
            market.update(delta);
        }

        self.tick += 1;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
