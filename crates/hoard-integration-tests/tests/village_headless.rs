//! Headless village scenarios driven entirely from data files.
//!
//! Loads `data/town` (RON resources, TOML recipes, JSON economy config),
//! builds a farm -> bakery -> villagers chain, and exercises ticking,
//! starvation, trading, offline catch-up and save/restore end to end.

use std::path::PathBuf;

use hoard_core::consumer::Consumer;
use hoard_core::economy::Economy;
use hoard_core::event::EventKind;
use hoard_core::id::{ConsumerId, MarketId, PoolId, ProducerId};
use hoard_core::offline::ManualClock;
use hoard_core::pool::ResourcePool;
use hoard_core::producer::Producer;
use hoard_core::state::EconomyState;
use hoard_core::test_utils::EventRecorder;
use hoard_data::{GameData, load_game_data};

// ===========================================================================
// Shared helpers
// ===========================================================================

fn town_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/town")
}

fn load_town() -> GameData {
    load_game_data(&town_dir()).unwrap()
}

struct Village {
    eco: Economy,
    clock: ManualClock,
    store: PoolId,
    farm: ProducerId,
    bakery: ProducerId,
    villagers: ConsumerId,
    market: MarketId,
}

/// Farm and bakery share one store; villagers eat 0.5 bread/s from it.
fn build_village() -> Village {
    let clock = ManualClock::new(1_700_000_000);
    let mut eco = load_town().into_economy().with_clock(clock.clone());
    let res = |eco: &Economy, id: &str| eco.resource(id).unwrap().clone();

    let mut store = ResourcePool::new();
    store.set(&res(&eco, "wheat"), 10.0);
    store.set(&res(&eco, "bread"), 10.0);
    store.set(&res(&eco, "gold"), 100.0);
    let store = eco.add_pool(store);

    let farm = eco.add_producer(
        Producer::new()
            .with_recipe(eco.recipe("farm").unwrap().clone())
            .with_output_pool(store)
            .with_auto_restart(true),
    );
    let bakery = eco.add_producer(
        Producer::new()
            .with_recipe(eco.recipe("bake").unwrap().clone())
            .with_output_pool(store)
            .with_auto_restart(true),
    );
    let bread = res(&eco, "bread");
    let villagers = eco.add_consumer(Consumer::new().with_pool(store).with_requirement(bread.clone(), 0.5));

    let market = eco.create_market();
    eco.market_mut(market).unwrap().register_resource(bread, 5.0, 1.0, 20.0);

    assert!(eco.start_producer(farm));
    assert!(eco.start_producer(bakery));
    eco.track_producer(farm);
    eco.track_producer(bakery);

    Village {
        eco,
        clock,
        store,
        farm,
        bakery,
        villagers,
        market,
    }
}

// ===========================================================================
// Loading
// ===========================================================================

#[test]
fn town_content_loads_from_mixed_formats() {
    let data = load_town();
    assert_eq!(data.registry.resource_count(), 4);
    assert_eq!(data.registry.recipe_count(), 3);

    let bread = data.registry.resource("bread").unwrap();
    assert_eq!(bread.max_value(), 500.0);
    assert_eq!(bread.description(), "Keeps the village fed.");
    assert_eq!(data.registry.recipe("chop").unwrap().output_chance("wood"), 0.5);

    assert_eq!(data.config.seed, 42);
    assert_eq!(data.config.market.price_speed, 1.0);
    assert_eq!(data.config.market.volatility, 0.1);
    assert_eq!(data.config.offline.max_hours, 2.0);
}

// ===========================================================================
// Production chain
// ===========================================================================

#[test]
fn farm_and_bakery_keep_the_village_fed() {
    let mut v = build_village();
    for _ in 0..60 {
        v.eco.step(1.0);
    }

    // One loaf per second baked, half a loaf eaten.
    assert_eq!(v.eco.amount(v.store, "bread"), 40.0);
    assert!(!v.eco.consumer(v.villagers).unwrap().is_starved());
    assert!(v.eco.producer(v.farm).unwrap().is_producing());
    assert!(v.eco.producer(v.bakery).unwrap().is_producing());
    assert_eq!(v.eco.tick(), 60);
}

#[test]
fn village_starves_once_the_bakery_closes() {
    let mut v = build_village();
    let recorder = EventRecorder::new();
    recorder.attach(
        v.eco.consumer_mut(v.villagers).unwrap().observers_mut(),
        &[EventKind::ResourceStarved, EventKind::ConsumerSatisfied],
    );

    v.eco.remove_producer(v.bakery);
    assert!(!v.eco.offline().contains_producer(v.bakery));
    for _ in 0..30 {
        v.eco.step(1.0);
    }
    assert!(v.eco.consumer(v.villagers).unwrap().is_starved());
    assert_eq!(v.eco.amount(v.store, "bread"), 0.0);
    assert_eq!(recorder.count(EventKind::ResourceStarved), 1);

    // A delivery ends the famine.
    let bread = v.eco.resource("bread").unwrap().clone();
    v.eco.pool_mut(v.store).unwrap().add(&bread, 50.0);
    v.eco.step(1.0);
    assert!(!v.eco.consumer(v.villagers).unwrap().is_starved());
    assert_eq!(recorder.count(EventKind::ConsumerSatisfied), 1);
}

#[test]
fn paused_village_does_not_advance() {
    let mut v = build_village();
    v.eco.pause();
    for _ in 0..10 {
        v.eco.step(1.0);
    }
    assert_eq!(v.eco.amount(v.store, "bread"), 10.0);
    assert_eq!(v.eco.tick(), 0);

    v.eco.resume();
    v.eco.step(1.0);
    assert_eq!(v.eco.tick(), 1);
}

// ===========================================================================
// Market
// ===========================================================================

#[test]
fn selling_surplus_bread_pays_and_depresses_the_price() {
    let mut v = build_village();
    assert!(v.eco.sell(v.market, v.store, "bread", 10.0, "gold"));
    // 10 loaves at 5 gold, 10% markdown.
    assert_eq!(v.eco.amount(v.store, "gold"), 145.0);
    assert_eq!(v.eco.amount(v.store, "bread"), 0.0);

    let market = v.eco.market(v.market).unwrap();
    assert_eq!(market.supply("bread"), 10.0);

    for _ in 0..5 {
        v.eco.step(1.0);
    }
    let price = v.eco.market(v.market).unwrap().price("bread");
    assert!(price < 5.0 && price >= 1.0, "price = {price}");

    // Cannot sell what the store does not have.
    assert!(!v.eco.sell(v.market, v.store, "bread", 1_000.0, "gold"));
    // Unregistered resources do not trade.
    assert!(!v.eco.sell(v.market, v.store, "wheat", 1.0, "gold"));
}

#[test]
fn buying_costs_markup_and_fails_when_broke() {
    let mut v = build_village();
    assert!(v.eco.buy(v.market, v.store, "bread", 10.0, "gold"));
    assert_eq!(v.eco.amount(v.store, "bread"), 20.0);
    assert!((v.eco.amount(v.store, "gold") - 45.0).abs() < 1e-9);

    assert!(!v.eco.buy(v.market, v.store, "bread", 100.0, "gold"));
    assert!((v.eco.amount(v.store, "gold") - 45.0).abs() < 1e-9);
}

// ===========================================================================
// Offline catch-up
// ===========================================================================

#[test]
fn overnight_absence_is_capped_by_config() {
    let mut v = build_village();
    let wheat_before = v.eco.amount(v.store, "wheat");

    v.eco.take_offline_snapshot();
    v.clock.advance(10 * 3600);

    let preview = v.eco.offline_progress();
    assert_eq!(preview.duration, 7200.0);
    assert_eq!(preview.produced["wheat"], 14_400.0);

    assert_eq!(v.eco.apply_offline(v.store), 7200.0);
    assert_eq!(v.eco.amount(v.store, "wheat"), wheat_before + 14_400.0);
    // 7200 loaves estimated, clamped at the bread cap.
    assert_eq!(v.eco.amount(v.store, "bread"), 500.0);
    assert_eq!(v.eco.offline().snapshot_time(), 0);

    // Applying again without a new snapshot does nothing.
    assert_eq!(v.eco.apply_offline(v.store), 0.0);
}

// ===========================================================================
// Save / restore
// ===========================================================================

#[test]
fn saved_village_resumes_identically() {
    let mut original = build_village();
    for _ in 0..7 {
        original.eco.step(1.0);
    }
    original.eco.sell(original.market, original.store, "bread", 5.0, "gold");
    original.eco.take_offline_snapshot();

    let json = serde_json::to_string(&original.eco.capture_state()).unwrap();
    let saved: EconomyState = serde_json::from_str(&json).unwrap();

    let mut restored = build_village();
    restored.eco.restore_state(&saved).unwrap();
    assert_eq!(restored.eco.tick(), 7);
    assert_eq!(
        restored.eco.offline().snapshot_time(),
        original.eco.offline().snapshot_time()
    );

    for _ in 0..13 {
        original.eco.step(1.0);
        restored.eco.step(1.0);
    }
    for id in ["gold", "wheat", "bread"] {
        assert_eq!(
            restored.eco.amount(restored.store, id),
            original.eco.amount(original.store, id),
            "{id}"
        );
    }
    assert_eq!(
        restored.eco.market(restored.market).unwrap().price("bread"),
        original.eco.market(original.market).unwrap().price("bread")
    );
}
