//! Timed production state machine.
//!
//! A [`Producer`] runs a shared [`ProductionRecipe`] against pools addressed
//! by [`PoolId`] handles:
//!
//! ```text
//! Idle --start()--> Producing --update() reaches effective time--> Idle
//!                       ^                                           |
//!                       +------------- auto_restart ----------------+
//! ```
//!
//! Inputs are taken from the input pool (falling back to the output pool)
//! when a cycle starts. They are consumed exactly once per cycle: either
//! refunded by [`Producer::cancel`] or converted into outputs on completion.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::event::{EconomyEvent, EventKind, Observers};
use crate::id::{PoolId, ProducerId};
use crate::pool::{PoolArena, ResourcePool};
use crate::recipe::ProductionRecipe;
use crate::rng::SimRng;

/// Arena of producers addressed by [`ProducerId`] handles.
pub type ProducerArena = SlotMap<ProducerId, Producer>;

// ---------------------------------------------------------------------------
// Runtime state
// ---------------------------------------------------------------------------

/// Runtime state of a producer. `elapsed_time` is meaningful only while
/// `is_producing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProductionState {
    pub is_producing: bool,
    pub elapsed_time: f64,
    pub inputs_consumed: bool,
}

// ---------------------------------------------------------------------------
// Start policy
// ---------------------------------------------------------------------------

/// Everything a [`ProductionGate`] may inspect when deciding whether a cycle
/// may start.
#[derive(Debug, Clone, Copy)]
pub struct StartCheck<'a> {
    pub recipe: &'a ProductionRecipe,
    pub input_pool: &'a ResourcePool,
    pub rate_multiplier: f64,
}

impl StartCheck<'_> {
    /// Recipe enabled and its inputs available in the input pool.
    pub fn default_policy(&self) -> bool {
        self.recipe.is_enabled() && self.recipe.can_produce(self.input_pool)
    }
}

/// Replaceable start policy.
///
/// Not-producing, recipe presence, and pool presence are structural and
/// always checked by [`Producer::start`]; so is input availability, which
/// guards against partial consumption. A gate can therefore add conditions
/// (power, staffing, quotas) but never force a cycle the pool cannot fund.
pub trait ProductionGate {
    fn can_produce(&self, check: &StartCheck<'_>) -> bool {
        check.default_policy()
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Runs a recipe on a timer, producing once per completed cycle.
pub struct Producer {
    recipe: Option<Arc<ProductionRecipe>>,
    output_pool: Option<PoolId>,
    input_pool: Option<PoolId>,
    rate_multiplier: f64,
    auto_restart: bool,
    state: ProductionState,
    rng: SimRng,
    gate: Option<Box<dyn ProductionGate>>,
    observers: Observers,
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("recipe", &self.recipe.as_ref().map(|r| r.id()))
            .field("output_pool", &self.output_pool)
            .field("input_pool", &self.input_pool)
            .field("rate_multiplier", &self.rate_multiplier)
            .field("auto_restart", &self.auto_restart)
            .field("state", &self.state)
            .field("gate", &self.gate.as_ref().map(|_| "<gate>"))
            .finish_non_exhaustive()
    }
}

impl Default for Producer {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer {
    pub fn new() -> Self {
        Self {
            recipe: None,
            output_pool: None,
            input_pool: None,
            rate_multiplier: 1.0,
            auto_restart: false,
            state: ProductionState::default(),
            rng: SimRng::default(),
            gate: None,
            observers: Observers::new(),
        }
    }

    pub fn with_recipe(mut self, recipe: Arc<ProductionRecipe>) -> Self {
        self.recipe = Some(recipe);
        self
    }

    pub fn with_output_pool(mut self, pool: PoolId) -> Self {
        self.output_pool = Some(pool);
        self
    }

    pub fn with_input_pool(mut self, pool: PoolId) -> Self {
        self.input_pool = Some(pool);
        self
    }

    pub fn with_rate_multiplier(mut self, multiplier: f64) -> Self {
        self.set_rate_multiplier(multiplier);
        self
    }

    pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SimRng::new(seed);
        self
    }

    pub fn with_gate(mut self, gate: impl ProductionGate + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn recipe(&self) -> Option<&Arc<ProductionRecipe>> {
        self.recipe.as_ref()
    }

    /// Swap the recipe. A cycle in progress is stopped without refund.
    pub fn set_recipe(&mut self, recipe: Option<Arc<ProductionRecipe>>) {
        if self.state.is_producing {
            tracing::debug!(
                recipe = self.recipe_id(),
                "recipe swapped mid-cycle; consumed inputs are forfeited"
            );
            self.stop();
        }
        self.recipe = recipe;
    }

    pub fn output_pool(&self) -> Option<PoolId> {
        self.output_pool
    }

    pub fn set_output_pool(&mut self, pool: Option<PoolId>) {
        self.output_pool = pool;
    }

    pub fn input_pool(&self) -> Option<PoolId> {
        self.input_pool
    }

    pub fn set_input_pool(&mut self, pool: Option<PoolId>) {
        self.input_pool = pool;
    }

    /// The pool inputs are drawn from: the input pool if set, else the
    /// output pool.
    pub fn effective_input_pool(&self) -> Option<PoolId> {
        self.input_pool.or(self.output_pool)
    }

    pub fn rate_multiplier(&self) -> f64 {
        self.rate_multiplier
    }

    /// Set the speed multiplier. Negative and NaN values become 0, which
    /// stalls production.
    pub fn set_rate_multiplier(&mut self, multiplier: f64) {
        debug_assert!(multiplier > 0.0, "rate multiplier must be positive");
        self.rate_multiplier = if multiplier.is_nan() { 0.0 } else { multiplier.max(0.0) };
    }

    pub fn auto_restart(&self) -> bool {
        self.auto_restart
    }

    pub fn set_auto_restart(&mut self, auto_restart: bool) {
        self.auto_restart = auto_restart;
    }

    /// Reseed the output-chance RNG.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = SimRng::new(seed);
    }

    pub fn rng(&self) -> &SimRng {
        &self.rng
    }

    /// Replace the output-chance RNG, e.g. with one captured in a save.
    pub fn set_rng(&mut self, rng: SimRng) {
        self.rng = rng;
    }

    pub fn set_gate(&mut self, gate: Option<Box<dyn ProductionGate>>) {
        self.gate = gate;
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn is_producing(&self) -> bool {
        self.state.is_producing
    }

    pub fn elapsed_time(&self) -> f64 {
        self.state.elapsed_time
    }

    pub fn state(&self) -> ProductionState {
        self.state
    }

    /// Overwrite the runtime state, e.g. when loading a save. No pools are
    /// touched: a restored in-progress cycle is assumed to have already paid
    /// its inputs.
    pub fn restore_production(&mut self, state: ProductionState) {
        self.state = if state.is_producing {
            state
        } else {
            ProductionState::default()
        };
    }

    /// `recipe.production_time / rate_multiplier`; infinite when the
    /// multiplier is 0 and 0 when there is no recipe.
    pub fn effective_production_time(&self) -> f64 {
        let Some(recipe) = &self.recipe else {
            return 0.0;
        };
        if self.rate_multiplier <= 0.0 {
            return f64::INFINITY;
        }
        recipe.production_time() / self.rate_multiplier
    }

    /// Fraction of the current cycle completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if !self.state.is_producing {
            return 0.0;
        }
        let effective = self.effective_production_time();
        if effective <= 0.0 {
            return 1.0;
        }
        (self.state.elapsed_time / effective).clamp(0.0, 1.0)
    }

    /// Seconds until the current cycle completes.
    pub fn remaining_time(&self) -> f64 {
        if !self.state.is_producing {
            return 0.0;
        }
        (self.effective_production_time() - self.state.elapsed_time).max(0.0)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Default start policy (or the installed gate) evaluated without side
    /// effects.
    pub fn can_produce(&self, pools: &PoolArena) -> bool {
        if self.state.is_producing {
            return false;
        }
        let Some(recipe) = self.recipe.as_deref() else {
            return false;
        };
        let Some(input) = self.effective_input_pool().and_then(|id| pools.get(id)) else {
            return false;
        };
        if !recipe.is_enabled() {
            return false;
        }
        let check = StartCheck {
            recipe,
            input_pool: input,
            rate_multiplier: self.rate_multiplier,
        };
        match &self.gate {
            Some(gate) => gate.can_produce(&check),
            None => check.default_policy(),
        }
    }

    /// Begin a cycle: consume every input once and enter `Producing`.
    pub fn start(&mut self, pools: &mut PoolArena) -> bool {
        if !self.can_produce(pools) {
            return false;
        }
        let Some(recipe) = self.recipe.clone() else {
            return false;
        };
        let Some(input) = self.effective_input_pool().and_then(|id| pools.get_mut(id)) else {
            return false;
        };
        if !recipe.can_produce(input) {
            return false;
        }

        recipe.consume_inputs(input);
        self.state = ProductionState {
            is_producing: true,
            elapsed_time: 0.0,
            inputs_consumed: true,
        };

        tracing::debug!(recipe = recipe.id(), "production started");
        self.observers.emit(EconomyEvent::ProductionStarted {
            recipe: recipe.id().to_string(),
        });
        true
    }

    /// Advance the timer by `delta` seconds; completes (and optionally
    /// restarts) once the effective production time is reached.
    pub fn update(&mut self, delta: f64, pools: &mut PoolArena) {
        if !self.state.is_producing {
            return;
        }
        self.state.elapsed_time += delta;
        if self.state.elapsed_time >= self.effective_production_time() {
            self.finish(pools);
        }
    }

    /// Force the current cycle to complete now. Returns false when idle.
    pub fn complete_immediately(&mut self, pools: &mut PoolArena) -> bool {
        if !self.state.is_producing {
            return false;
        }
        self.finish(pools);
        true
    }

    /// Abort the current cycle. Consumed inputs are not refunded.
    pub fn stop(&mut self) {
        self.state = ProductionState::default();
    }

    /// Abort the current cycle and refund its inputs to the effective input
    /// pool. Returns whether a refund happened.
    pub fn cancel(&mut self, pools: &mut PoolArena) -> bool {
        if !self.state.is_producing {
            return false;
        }

        let mut refunded = false;
        if self.state.inputs_consumed
            && let Some(recipe) = self.recipe.as_deref()
        {
            match self.effective_input_pool().and_then(|id| pools.get_mut(id)) {
                Some(pool) => {
                    recipe.refund_inputs(pool);
                    refunded = true;
                }
                None => tracing::warn!(
                    recipe = recipe.id(),
                    "input pool missing on cancel; inputs cannot be refunded"
                ),
            }
        }

        let recipe = self.recipe_id().to_string();
        self.stop();
        tracing::debug!(recipe = %recipe, refunded, "production cancelled");
        self.observers
            .emit(EconomyEvent::ProductionCancelled { recipe, refunded });
        refunded
    }

    /// Completion shared by `update` and `complete_immediately`.
    fn finish(&mut self, pools: &mut PoolArena) {
        let Some(recipe) = self.recipe.clone() else {
            self.stop();
            return;
        };

        let rolled = recipe.roll_outputs(&mut self.rng);
        match self.output_pool.and_then(|id| pools.get_mut(id)) {
            Some(pool) => {
                for (resource, amount) in &rolled {
                    pool.add(resource, *amount);
                }
            }
            None => tracing::warn!(recipe = recipe.id(), "output pool missing; outputs dropped"),
        }

        self.stop();
        tracing::debug!(recipe = recipe.id(), outputs = rolled.len(), "production complete");
        self.observers.emit(EconomyEvent::ProductionCompleted {
            recipe: recipe.id().to_string(),
            produced: rolled
                .iter()
                .map(|(resource, amount)| (resource.id().to_string(), *amount))
                .collect(),
        });

        if self.auto_restart {
            self.start(pools);
        }
    }

    fn recipe_id(&self) -> &str {
        self.recipe.as_ref().map(|r| r.id()).unwrap_or("")
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

    /// `listener(recipe_id)` whenever a cycle starts.
    pub fn on_production_started(&mut self, mut listener: impl FnMut(&str) + 'static) {
        self.on_event(EventKind::ProductionStarted, move |e| {
            if let EconomyEvent::ProductionStarted { recipe } = e {
                listener(recipe);
            }
        });
    }

    /// `listener(recipe_id, produced)` whenever a cycle completes.
    pub fn on_production_complete(
        &mut self,
        mut listener: impl FnMut(&str, &[(String, f64)]) + 'static,
    ) {
        self.on_event(EventKind::ProductionCompleted, move |e| {
            if let EconomyEvent::ProductionCompleted { recipe, produced } = e {
                listener(recipe, produced);
            }
        });
    }
}

// ===========================================================================
// Tests
// ===========================================================================
