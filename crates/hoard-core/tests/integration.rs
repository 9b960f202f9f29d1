//! End-to-end scenarios through the public API.

use std::sync::Arc;

use hoard_core::consumer::Consumer;
use hoard_core::event::{EconomyEvent, EventKind};
use hoard_core::offline::{ManualClock, OfflineCalculator};
use hoard_core::pool::{PoolArena, ResourcePool};
use hoard_core::producer::{Producer, ProducerArena};
use hoard_core::recipe::ProductionRecipe;
use hoard_core::resource::Resource;
use hoard_core::test_utils::*;

// ===========================================================================
// Pools
// ===========================================================================

#[test]
fn global_multiplier_doubles_gains() {
    let res = Resource::new("gold");
    let mut pool = ResourcePool::new();
    pool.set_global_multiplier(2.0);
    pool.add(&res, 5.0);
    assert_eq!(pool.get(&res), 10.0);
}

#[test]
fn pool_events_report_changes_and_depletion() {
    let (mut eco, _) = test_economy(1);
    let pool = seeded_pool(&mut eco, &[("wood", 3.0)]);
    let recorder = EventRecorder::new();
    recorder.attach(
        eco.pool_mut(pool).unwrap().observers_mut(),
        &[EventKind::ResourceChanged, EventKind::ResourceDepleted],
    );
    let wood = eco.resource("wood").unwrap().clone();

    let p = eco.pool_mut(pool).unwrap();
    assert!(p.remove(&wood, 3.0));
    assert!(!p.remove(&wood, 1.0));
    p.set(&wood, 0.0);

    assert_eq!(recorder.count(EventKind::ResourceChanged), 1);
    assert_eq!(recorder.count(EventKind::ResourceDepleted), 1);
}

// ===========================================================================
// Starvation
// ===========================================================================

#[test]
fn half_unit_pool_starves_once_then_recovers_once() {
    let food = Arc::new(Resource::new("food"));
    let mut pools = PoolArena::with_key();
    let mut pool = ResourcePool::new();
    pool.set(&food, 0.5);
    let id = pools.insert(pool);

    let mut consumer = Consumer::new().with_pool(id).with_requirement(food.clone(), 1.0);
    let recorder = EventRecorder::new();
    recorder.attach(
        consumer.observers_mut(),
        &[EventKind::ResourceStarved, EventKind::ConsumerSatisfied],
    );

    consumer.update(1.0, &mut pools);
    assert!(consumer.is_starved());
    assert_eq!(recorder.count(EventKind::ResourceStarved), 1);
    assert_eq!(recorder.count(EventKind::ConsumerSatisfied), 0);

    pools[id].set(&food, 1.0);
    consumer.update(1.0, &mut pools);
    assert!(!consumer.is_starved());
    assert_eq!(recorder.count(EventKind::ResourceStarved), 1);
    assert_eq!(recorder.count(EventKind::ConsumerSatisfied), 1);
    assert_eq!(consumer.satisfaction(), 1.0);
}

// ===========================================================================
// Production
// ===========================================================================

#[test]
fn start_then_cancel_restores_inputs() {
    let (mut eco, _) = test_economy(1);
    let pool = seeded_pool(&mut eco, &[("wood", 7.0)]);
    let p = add_producer(&mut eco, "saw", pool);

    assert!(eco.start_producer(p));
    assert_eq!(eco.amount(pool, "wood"), 5.0);
    assert!(eco.cancel_producer(p));
    assert_eq!(eco.amount(pool, "wood"), 7.0);
    assert!(!eco.producer(p).unwrap().is_producing());
}

#[test]
fn auto_restart_chain_runs_until_inputs_run_out() {
    let (mut eco, _) = test_economy(1);
    let pool = seeded_pool(&mut eco, &[("wood", 10.0)]);
    let p = add_producer(&mut eco, "saw", pool);
    eco.producer_mut(p).unwrap().set_auto_restart(true);

    let recorder = EventRecorder::new();
    recorder.attach(
        eco.producer_mut(p).unwrap().observers_mut(),
        &[EventKind::ProductionStarted, EventKind::ProductionCompleted],
    );

    eco.start_producer(p);
    for _ in 0..20 {
        eco.step(0.5);
    }
    assert_eq!(eco.amount(pool, "plank"), 5.0);
    assert_eq!(eco.amount(pool, "wood"), 0.0);
    assert_eq!(recorder.count(EventKind::ProductionStarted), 5);
    assert_eq!(recorder.count(EventKind::ProductionCompleted), 5);
}

#[test]
fn producer_event_sequence() {
    let (mut eco, _) = test_economy(1);
    let pool = seeded_pool(&mut eco, &[("wood", 4.0)]);
    let p = add_producer(&mut eco, "saw", pool);
    let recorder = EventRecorder::new();
    recorder.attach(eco.producer_mut(p).unwrap().observers_mut(), &ALL_EVENT_KINDS);

    eco.start_producer(p);
    eco.step(1.0);
    assert_eq!(
        recorder.events(),
        vec![
            EconomyEvent::ProductionStarted {
                recipe: "saw".into()
            },
            EconomyEvent::ProductionCompleted {
                recipe: "saw".into(),
                produced: vec![("plank".into(), 1.0)],
            },
        ]
    );

    recorder.clear();
    eco.start_producer(p);
    eco.cancel_producer(p);
    assert_eq!(
        recorder.events().last(),
        Some(&EconomyEvent::ProductionCancelled {
            recipe: "saw".into(),
            refunded: true
        })
    );
    assert_eq!(recorder.count(EventKind::ProductionStarted), 1);
}

#[test]
fn chance_outputs_are_independent_and_seeded() {
    let run = || {
        let (mut eco, _) = test_economy(1);
        let pool = seeded_pool(&mut eco, &[]);
        let p = add_producer(&mut eco, "forage", pool);
        eco.producer_mut(p).unwrap().set_auto_restart(true);
        eco.start_producer(p);
        for _ in 0..400 {
            eco.step(5.0);
        }
        (eco.amount(pool, "food"), eco.amount(pool, "wood"))
    };
    let (food, wood) = run();
    assert_eq!(food, 1000.0, "food is capped at its max");
    // 400 rolls at 25%: far from both 0 and 400.
    assert!(wood > 60.0 && wood < 140.0, "wood = {wood}");
    assert_eq!(run(), (food, wood));
}

// ===========================================================================
// Offline
// ===========================================================================

#[test]
fn one_hour_offline_yields_sixty_cycles() {
    let gold = Arc::new(Resource::new("gold"));
    let recipe = Arc::new(
        ProductionRecipe::new("mint")
            .with_production_time(60.0)
            .with_output(gold.clone(), 10.0, 1.0),
    );
    let mut producers = ProducerArena::with_key();
    let id = producers.insert(Producer::new().with_recipe(recipe));
    let mut calc = OfflineCalculator::default();
    calc.add_producer(id);

    let mut pool = ResourcePool::new();
    calc.calculate_duration(3600.0, &producers, &mut pool);
    assert_eq!(pool.get(&gold), 600.0);
}

#[test]
fn short_absence_changes_nothing() {
    let (mut eco, clock) = test_economy(1_700_000_000);
    let pool = seeded_pool(&mut eco, &[("gold", 5.0)]);
    let p = add_producer(&mut eco, "mine", pool);
    eco.track_producer(p);

    eco.take_offline_snapshot();
    clock.advance(30);
    assert_eq!(eco.apply_offline(pool), 0.0);
    assert_eq!(eco.amount(pool, "gold"), 5.0);
    // The snapshot survives a rejected catch-up.
    assert_eq!(eco.offline().snapshot_time(), 1_700_000_000);
}

#[test]
fn long_absence_is_capped_at_max_hours() {
    let clock = ManualClock::new(1_000);
    let (mut eco, _) = test_economy(0);
    eco = eco.with_clock(clock.clone());
    let pool = seeded_pool(&mut eco, &[]);
    let p = add_producer(&mut eco, "mine", pool);
    eco.track_producer(p);

    eco.take_offline_snapshot();
    clock.advance(3 * 24 * 3600);
    assert_eq!(eco.apply_offline(pool), 24.0 * 3600.0);
    // 24h of 60s cycles at 10 gold.
    assert_eq!(eco.amount(pool, "gold"), 14_400.0);
}
