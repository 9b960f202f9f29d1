//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::EconomyConfig;
use crate::economy::Economy;
use crate::event::{EconomyEvent, EventKind, Observers};
use crate::id::{PoolId, ProducerId};
use crate::offline::ManualClock;
use crate::pool::ResourcePool;
use crate::producer::Producer;
use crate::recipe::ProductionRecipe;
use crate::registry::{Registry, RegistryBuilder};
use crate::resource::{Resource, ResourceCategory};

// ===========================================================================
// Resource constructors
// ===========================================================================

pub fn gold() -> Resource {
    Resource::new("gold")
        .with_name("Gold")
        .with_category(ResourceCategory::Currency)
        .with_decimal_places(1)
}
pub fn wood() -> Resource {
    Resource::new("wood").with_name("Wood")
}
pub fn plank() -> Resource {
    Resource::new("plank").with_name("Plank")
}
pub fn food() -> Resource {
    Resource::new("food").with_name("Food").with_bounds(0.0, 1000.0)
}
pub fn energy() -> Resource {
    Resource::new("energy")
        .with_name("Energy")
        .with_category(ResourceCategory::Energy)
        .with_bounds(0.0, 100.0)
}

// ===========================================================================
// Registry
// ===========================================================================

/// gold, wood, plank, food, energy with three recipes:
///
/// - `saw`: 2 wood -> 1 plank, 1 s
/// - `mine`: -> 10 gold, 60 s
/// - `forage`: -> 3 food (always) + 1 wood (25%), 5 s
pub fn sawmill_registry() -> Registry {
    let mut b = RegistryBuilder::new();
    let gold = b.register_resource(gold()).unwrap();
    let wood = b.register_resource(wood()).unwrap();
    let plank = b.register_resource(plank()).unwrap();
    let food = b.register_resource(food()).unwrap();
    b.register_resource(energy()).unwrap();

    b.register_recipe(
        ProductionRecipe::new("saw")
            .with_name("Saw Planks")
            .with_production_time(1.0)
            .with_input(wood.clone(), 2.0)
            .with_output(plank, 1.0, 1.0),
    )
    .unwrap();
    b.register_recipe(
        ProductionRecipe::new("mine")
            .with_name("Mine Gold")
            .with_production_time(60.0)
            .with_output(gold, 10.0, 1.0),
    )
    .unwrap();
    b.register_recipe(
        ProductionRecipe::new("forage")
            .with_production_time(5.0)
            .with_output(food, 3.0, 1.0)
            .with_output(wood, 1.0, 0.25),
    )
    .unwrap();
    b.build().unwrap()
}

/// A default-config economy over [`sawmill_registry`], driven by a manual
/// clock starting at `now`.
pub fn test_economy(now: u64) -> (Economy, ManualClock) {
    let clock = ManualClock::new(now);
    let eco = Economy::new(Arc::new(sawmill_registry()), EconomyConfig::default())
        .with_clock(clock.clone());
    (eco, clock)
}

/// Add a pool seeded with `(resource_id, amount)` pairs.
pub fn seeded_pool(eco: &mut Economy, amounts: &[(&str, f64)]) -> PoolId {
    let mut pool = ResourcePool::new();
    for (id, amount) in amounts {
        let resource = eco.resource(id).unwrap().clone();
        pool.set(&resource, *amount);
    }
    eco.add_pool(pool)
}

/// Add a producer running `recipe_id` into `pool`.
pub fn add_producer(eco: &mut Economy, recipe_id: &str, pool: PoolId) -> ProducerId {
    let recipe = eco.recipe(recipe_id).unwrap().clone();
    eco.add_producer(Producer::new().with_recipe(recipe).with_output_pool(pool))
}

// ===========================================================================
// Event recording
// ===========================================================================

/// Collects every event of the subscribed kinds, in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<EconomyEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `kinds` on an observer set.
    pub fn attach(&self, observers: &mut Observers, kinds: &[EventKind]) {
        for kind in kinds {
            let sink = self.events.clone();
            observers.subscribe(*kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
        }
    }

    pub fn events(&self) -> Vec<EconomyEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

pub const ALL_EVENT_KINDS: [EventKind; 8] = [
    EventKind::ResourceChanged,
    EventKind::ResourceDepleted,
    EventKind::ProductionStarted,
    EventKind::ProductionCompleted,
    EventKind::ProductionCancelled,
    EventKind::ResourceStarved,
    EventKind::ConsumerSatisfied,
    EventKind::PriceChanged,
];
