//! Idle economy example: a sawmill town with a market and offline catch-up.
//!
//! A forager gathers food and wood, a sawmill turns wood into planks, the
//! villagers eat, and surplus planks are sold. Then the player "leaves" for
//! two hours and comes back.
//!
//! Run with: `RUST_LOG=debug cargo run -p hoard-core --example idle_economy`

use std::sync::Arc;

use hoard_core::config::EconomyConfig;
use hoard_core::consumer::Consumer;
use hoard_core::economy::Economy;
use hoard_core::offline::ManualClock;
use hoard_core::pool::ResourcePool;
use hoard_core::producer::Producer;
use hoard_core::test_utils::sawmill_registry;

fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a tracing subscriber is already installed");
    }

    let clock = ManualClock::new(1_700_000_000);
    let mut eco = Economy::new(Arc::new(sawmill_registry()), EconomyConfig::default())
        .with_clock(clock.clone());

    let registry = eco.registry().clone();
    let res = |id: &str| registry.resource(id).cloned().unwrap_or_else(|| panic!("missing {id}"));
    let recipe = |id: &str| registry.recipe(id).cloned().unwrap_or_else(|| panic!("missing {id}"));

    // --- Town storage ---

    let mut town = ResourcePool::new();
    town.set(&res("gold"), 50.0);
    town.set(&res("wood"), 10.0);
    town.set(&res("food"), 20.0);
    town.on_resource_depleted(|id| println!("  !! {id} ran out"));
    let town = eco.add_pool(town);

    // --- Producers ---

    let forager = eco.add_producer(
        Producer::new()
            .with_recipe(recipe("forage"))
            .with_output_pool(town)
            .with_auto_restart(true),
    );
    let sawmill = eco.add_producer(
        Producer::new()
            .with_recipe(recipe("saw"))
            .with_output_pool(town)
            .with_auto_restart(true),
    );
    let mine = eco.add_producer(
        Producer::new()
            .with_recipe(recipe("mine"))
            .with_output_pool(town)
            .with_auto_restart(true),
    );

    // --- Villagers ---

    let mut villagers = Consumer::new().with_pool(town).with_requirement(res("food"), 0.5);
    villagers.on_starved(|id| println!("  villagers are starving for {id}"));
    villagers.on_satisfied(|| println!("  villagers are fed again"));
    let villagers = eco.add_consumer(villagers);

    // --- Market ---

    let market = eco.create_market();
    if let Some(m) = eco.market_mut(market) {
        m.register_resource(res("plank"), 8.0, 2.0, 20.0);
        m.on_price_changed(|id, old, new| {
            if (new - old).abs() > 0.5 {
                println!("  {id} price {old:.2} -> {new:.2}");
            }
        });
    }

    for p in [forager, sawmill, mine] {
        eco.start_producer(p);
        eco.track_producer(p);
    }

    // --- Play for one minute ---

    println!("=== Playing ===");
    for second in 1..=60 {
        eco.step(1.0);
        if second % 10 == 0 {
            let planks = eco.amount(town, "plank");
            if planks >= 2.0 {
                eco.sell(market, town, "plank", planks.floor(), "gold");
            }
            println!(
                "t={second:>2}s gold={} wood={} plank={} food={} (food lasts {:.0}s)",
                res("gold").format_value(eco.amount(town, "gold")),
                eco.amount(town, "wood"),
                eco.amount(town, "plank"),
                eco.amount(town, "food"),
                eco.time_until_starved(villagers, "food"),
            );
        }
    }

    // --- Leave for two hours ---

    println!("=== Away ===");
    eco.take_offline_snapshot();
    clock.advance(2 * 3600);

    let preview = eco.offline_progress();
    println!("away for {:.1}h, expecting:", preview.duration / 3600.0);
    for (id, amount) in &preview.produced {
        println!("  +{amount:.1} {id}");
    }
    eco.apply_offline(town);

    println!("=== Back ===");
    for id in ["gold", "wood", "plank", "food"] {
        println!("  {id}: {}", res(id).format_value(eco.amount(town, id)));
    }
}
