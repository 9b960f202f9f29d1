//! Away-from-keyboard catch-up.
//!
//! The calculator records a wall-clock snapshot when the player leaves and,
//! on return, credits each tracked producer with the *expected* output of
//! the cycles it would have completed:
//!
//! ```text
//! cycles = duration * efficiency * rate_multiplier / production_time
//! total  = cycles * amount * chance            (per output)
//! ```
//!
//! Producers that would not finish a single cycle contribute nothing.
//! Recipe inputs are not drawn while offline; catch-up assumes raw
//! materials were available for the whole absence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::OfflineConfig;
use crate::id::ProducerId;
use crate::pool::ResourcePool;
use crate::producer::ProducerArena;
use crate::resource::Resource;

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Source of wall-clock time in whole unix seconds.
pub trait Clock {
    fn now_unix(&self) -> u64;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock driven by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(Arc::new(AtomicU64::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Expected offline output, before it is merged into any pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfflineProgress {
    /// Simulated seconds after clamping.
    pub duration: f64,
    /// Resource id to expected amount.
    pub produced: BTreeMap<String, f64>,
}

impl OfflineProgress {
    pub fn is_empty(&self) -> bool {
        self.produced.is_empty()
    }
}

pub struct OfflineCalculator {
    producers: Vec<ProducerId>,
    config: OfflineConfig,
    snapshot_time: u64,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for OfflineCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCalculator")
            .field("producers", &self.producers)
            .field("config", &self.config)
            .field("snapshot_time", &self.snapshot_time)
            .finish_non_exhaustive()
    }
}

impl Default for OfflineCalculator {
    fn default() -> Self {
        Self::new(OfflineConfig::default())
    }
}

impl OfflineCalculator {
    pub fn new(config: OfflineConfig) -> Self {
        Self {
            producers: Vec::new(),
            config: config.sanitized(),
            snapshot_time: 0,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OfflineConfig) {
        self.config = config.sanitized();
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Record the current time as the moment the player left.
    pub fn take_snapshot(&mut self) {
        self.snapshot_time = self.clock.now_unix();
    }

    /// Unix seconds of the last snapshot; 0 means none.
    pub fn snapshot_time(&self) -> u64 {
        self.snapshot_time
    }

    pub fn set_snapshot_time(&mut self, unix_seconds: u64) {
        self.snapshot_time = unix_seconds;
    }

    pub fn clear_snapshot(&mut self) {
        self.snapshot_time = 0;
    }

    /// Seconds elapsed since the snapshot, 0 without one.
    pub fn elapsed_since_snapshot(&self) -> f64 {
        if self.snapshot_time == 0 {
            return 0.0;
        }
        self.clock.now_unix().saturating_sub(self.snapshot_time) as f64
    }

    // -----------------------------------------------------------------------
    // Tracking
    // -----------------------------------------------------------------------

    /// Track a producer. Returns false if it was already tracked.
    pub fn add_producer(&mut self, producer: ProducerId) -> bool {
        if self.producers.contains(&producer) {
            return false;
        }
        self.producers.push(producer);
        true
    }

    pub fn remove_producer(&mut self, producer: ProducerId) -> bool {
        let before = self.producers.len();
        self.producers.retain(|p| *p != producer);
        self.producers.len() != before
    }

    pub fn contains_producer(&self, producer: ProducerId) -> bool {
        self.producers.contains(&producer)
    }

    pub fn clear_producers(&mut self) {
        self.producers.clear();
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    // -----------------------------------------------------------------------
    // Calculation
    // -----------------------------------------------------------------------

    /// Absence to simulate: 0 below the minimum, capped at `max_hours`.
    fn effective_duration(&self) -> f64 {
        if self.snapshot_time == 0 {
            return 0.0;
        }
        let elapsed = self.elapsed_since_snapshot();
        if elapsed < self.config.min_seconds {
            return 0.0;
        }
        let cap = self.config.max_hours * 3600.0;
        if cap.is_finite() { elapsed.min(cap) } else { elapsed }
    }

    /// Expected output of every tracked producer over `duration` seconds,
    /// keyed by resource id.
    fn expected_outputs(
        &self,
        duration: f64,
        producers: &ProducerArena,
    ) -> BTreeMap<String, (Arc<Resource>, f64)> {
        let mut totals: BTreeMap<String, (Arc<Resource>, f64)> = BTreeMap::new();
        if duration <= 0.0 {
            return totals;
        }
        for id in &self.producers {
            let Some(producer) = producers.get(*id) else {
                continue;
            };
            let Some(recipe) = producer.recipe() else {
                continue;
            };
            let time = recipe.production_time();
            let rate = producer.rate_multiplier();
            if time <= 0.0 || rate <= 0.0 {
                continue;
            }
            let cycles = duration * self.config.efficiency * rate / time;
            if cycles < 1.0 {
                continue;
            }
            for output in recipe.outputs() {
                let total = cycles * output.amount * output.chance;
                totals
                    .entry(output.resource.id().to_string())
                    .or_insert_with(|| (output.resource.clone(), 0.0))
                    .1 += total;
            }
        }
        totals
    }

    /// Add the expected output over `duration` seconds to `result_pool`.
    pub fn calculate_duration(
        &self,
        duration: f64,
        producers: &ProducerArena,
        result_pool: &mut ResourcePool,
    ) {
        for (resource, total) in self.expected_outputs(duration, producers).values() {
            result_pool.add(resource, *total);
        }
    }

    /// Simulate the time since the snapshot into `result_pool`. Returns the
    /// simulated seconds; 0 means nothing happened.
    pub fn calculate(&self, producers: &ProducerArena, result_pool: &mut ResourcePool) -> f64 {
        let duration = self.effective_duration();
        if duration > 0.0 {
            self.calculate_duration(duration, producers, result_pool);
        }
        duration
    }

    /// Side-effect-free summary of what [`apply`](Self::apply) would add,
    /// before the target pool's multipliers.
    pub fn calculate_progress(&self, producers: &ProducerArena) -> OfflineProgress {
        let duration = self.effective_duration();
        OfflineProgress {
            duration,
            produced: self
                .expected_outputs(duration, producers)
                .into_iter()
                .map(|(id, (_, total))| (id, total))
                .collect(),
        }
    }

    /// Calculate into a scratch pool and merge the result into `pool`.
    /// The snapshot is kept; call [`clear_snapshot`](Self::clear_snapshot)
    /// or [`take_snapshot`](Self::take_snapshot) afterwards.
    pub fn apply(&self, producers: &ProducerArena, pool: &mut ResourcePool) -> f64 {
        let duration = self.effective_duration();
        if duration <= 0.0 {
            return 0.0;
        }
        let outputs = self.expected_outputs(duration, producers);
        let mut scratch = ResourcePool::new();
        for (resource, total) in outputs.values() {
            scratch.add(resource, *total);
        }
        for (resource, _) in outputs.values() {
            pool.add(resource, scratch.get(resource));
        }
        tracing::info!(
            hours = duration / 3600.0,
            resources = outputs.len(),
            "applied offline progress"
        );
        duration
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::Producer;
    use crate::recipe::ProductionRecipe;

    fn gold() -> Arc<Resource> {
        Arc::new(Resource::new("gold"))
    }

    fn mine(time: f64, amount: f64, chance: f64) -> Arc<ProductionRecipe> {
        Arc::new(
            ProductionRecipe::new("mine")
                .with_production_time(time)
                .with_output(gold(), amount, chance),
        )
    }

    fn setup(recipe: Arc<ProductionRecipe>) -> (ProducerArena, ProducerId, OfflineCalculator, ManualClock) {
        let mut producers = ProducerArena::with_key();
        let id = producers.insert(Producer::new().with_recipe(recipe));
        let clock = ManualClock::new(1_000_000);
        let mut calc = OfflineCalculator::default().with_clock(clock.clone());
        calc.add_producer(id);
        (producers, id, calc, clock)
    }

    #[test]
    fn one_hour_of_one_minute_cycles() {
        let (producers, _, calc, _) = setup(mine(60.0, 10.0, 1.0));
        let mut pool = ResourcePool::new();
        calc.calculate_duration(3600.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 600.0);
    }

    #[test]
    fn expected_value_uses_chance() {
        let (producers, _, calc, _) = setup(mine(60.0, 10.0, 0.25));
        let mut pool = ResourcePool::new();
        calc.calculate_duration(3600.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 150.0);
    }

    #[test]
    fn fractional_cycles_count_once_past_one() {
        let (producers, _, calc, _) = setup(mine(60.0, 1.0, 1.0));
        let mut pool = ResourcePool::new();
        calc.calculate_duration(30.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 0.0);
        calc.calculate_duration(90.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 1.5);
    }

    #[test]
    fn efficiency_and_rate_scale_cycles() {
        let (mut producers, id, mut calc, _) = setup(mine(60.0, 1.0, 1.0));
        producers[id].set_rate_multiplier(2.0);
        calc.set_config(OfflineConfig {
            efficiency: 0.5,
            ..OfflineConfig::default()
        });
        let mut pool = ResourcePool::new();
        calc.calculate_duration(600.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 10.0);
    }

    #[test]
    fn efficiency_above_one_is_capped() {
        let (producers, _, mut calc, _) = setup(mine(60.0, 10.0, 1.0));
        calc.set_config(OfflineConfig {
            efficiency: 2.0,
            ..OfflineConfig::default()
        });
        assert_eq!(calc.config().efficiency, 1.0);
        let mut pool = ResourcePool::new();
        calc.calculate_duration(3600.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 600.0);
    }

    #[test]
    fn below_threshold_does_nothing() {
        let (producers, _, mut calc, clock) = setup(mine(1.0, 1.0, 1.0));
        calc.take_snapshot();
        clock.advance(59);
        let mut pool = ResourcePool::new();
        assert_eq!(calc.calculate(&producers, &mut pool), 0.0);
        assert!(pool.is_empty());
        assert_eq!(calc.apply(&producers, &mut pool), 0.0);
        assert!(pool.is_empty());
    }

    #[test]
    fn no_snapshot_does_nothing() {
        let (producers, _, calc, clock) = setup(mine(1.0, 1.0, 1.0));
        clock.advance(10_000);
        let mut pool = ResourcePool::new();
        assert_eq!(calc.calculate(&producers, &mut pool), 0.0);
        assert_eq!(calc.elapsed_since_snapshot(), 0.0);
    }

    #[test]
    fn duration_is_capped() {
        let (producers, _, mut calc, clock) = setup(mine(3600.0, 1.0, 1.0));
        calc.take_snapshot();
        clock.advance(7 * 24 * 3600);
        let mut pool = ResourcePool::new();
        assert_eq!(calc.calculate(&producers, &mut pool), 24.0 * 3600.0);
        assert_eq!(pool.get(&gold()), 24.0);
    }

    #[test]
    fn infinite_cap_disables_clamp() {
        let (producers, _, mut calc, clock) = setup(mine(3600.0, 1.0, 1.0));
        calc.set_config(OfflineConfig {
            max_hours: f64::INFINITY,
            ..OfflineConfig::default()
        });
        calc.take_snapshot();
        clock.advance(48 * 3600);
        let mut pool = ResourcePool::new();
        assert_eq!(calc.calculate(&producers, &mut pool), 48.0 * 3600.0);
    }

    #[test]
    fn apply_merges_through_pool_multipliers() {
        let (producers, _, mut calc, clock) = setup(mine(60.0, 1.0, 1.0));
        calc.take_snapshot();
        clock.advance(600);
        let mut pool = ResourcePool::new();
        pool.set_global_multiplier(2.0);
        assert_eq!(calc.apply(&producers, &mut pool), 600.0);
        assert_eq!(pool.get(&gold()), 20.0);
        assert_eq!(calc.snapshot_time(), 1_000_000);
    }

    #[test]
    fn progress_preview_matches_apply() {
        let (producers, _, mut calc, clock) = setup(mine(60.0, 2.0, 1.0));
        calc.take_snapshot();
        clock.advance(120);
        let progress = calc.calculate_progress(&producers);
        assert_eq!(progress.duration, 120.0);
        assert_eq!(progress.produced.get("gold"), Some(&4.0));
    }

    #[test]
    fn skips_invalid_and_removed_producers() {
        let (mut producers, id, mut calc, _) = setup(mine(0.0, 1.0, 1.0));
        let idle = producers.insert(Producer::new());
        calc.add_producer(idle);
        let mut pool = ResourcePool::new();
        calc.calculate_duration(3600.0, &producers, &mut pool);
        assert!(pool.is_empty());

        producers.remove(id);
        calc.calculate_duration(3600.0, &producers, &mut pool);
        assert!(pool.is_empty());
    }

    #[test]
    fn producer_tracking_is_idempotent() {
        let (_, id, mut calc, _) = setup(mine(1.0, 1.0, 1.0));
        assert!(!calc.add_producer(id));
        assert_eq!(calc.producer_count(), 1);
        assert!(calc.contains_producer(id));
        assert!(calc.remove_producer(id));
        assert!(!calc.remove_producer(id));
        calc.add_producer(id);
        calc.clear_producers();
        assert_eq!(calc.producer_count(), 0);
    }

    #[test]
    fn inputs_are_not_consumed_offline() {
        let wood = Arc::new(Resource::new("wood"));
        let recipe = Arc::new(
            ProductionRecipe::new("saw")
                .with_production_time(10.0)
                .with_input(wood.clone(), 100.0)
                .with_output(gold(), 1.0, 1.0),
        );
        let (producers, _, calc, _) = setup(recipe);
        let mut pool = ResourcePool::new();
        calc.calculate_duration(100.0, &producers, &mut pool);
        assert_eq!(pool.get(&gold()), 10.0);
        assert_eq!(pool.get(&wood), 0.0);
    }
}
