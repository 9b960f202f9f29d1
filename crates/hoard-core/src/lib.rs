//! Hoard Core -- the resource-economy simulation layer for data-driven games.
//!
//! This crate models typed resources, the pools that store them, recipe
//! based transformations, timed producers, continuous consumers, a
//! supply/demand market, and an expected-value offline progress calculator.
//!
//! # Tick Order
//!
//! Each call to [`economy::Economy::step`] advances every component by the
//! same `delta` (seconds) in a fixed order:
//!
//! 1. **Producers** -- advance production timers; completed cycles credit
//!    their output pools and may auto-restart.
//! 2. **Consumers** -- drain per-second requirements; track starvation.
//! 3. **Markets** -- move prices toward the supply/demand target and decay
//!    the accumulators.
//! 4. **Bookkeeping** -- increment the tick counter.
//!
//! All components are single-threaded state machines. A pool shared by
//! several components sees their mutations in the order above.
//!
//! # Key Types
//!
//! - [`resource::Resource`] -- immutable, bounded quantity kind (gold, wood).
//! - [`pool::ResourcePool`] -- per-owner amounts with gain multipliers.
//! - [`recipe::ProductionRecipe`] -- reusable inputs -> outputs template.
//! - [`producer::Producer`] -- runs a recipe on a timer.
//! - [`consumer::Consumer`] -- drains resources at fixed per-second rates.
//! - [`market::Market`] -- per-resource price simulation.
//! - [`offline::OfflineCalculator`] -- away-from-keyboard catch-up.
//! - [`registry::Registry`] -- frozen id -> resource/recipe lookup.
//! - [`event::Observers`] -- synchronous per-component notifications.

pub mod config;
pub mod consumer;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod economy;
pub mod event;
pub mod id;
pub mod market;
pub mod offline;
pub mod pool;
pub mod producer;
pub mod recipe;
pub mod registry;
pub mod resource;
pub mod rng;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
