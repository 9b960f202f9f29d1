//! Production recipes: reusable inputs -> outputs templates.
//!
//! A [`ProductionRecipe`] holds no runtime state, so a single recipe is
//! shared (behind an `Arc`) by every producer that runs it.
//!
//! # Atomicity
//!
//! Every `produce*` operation re-checks [`ProductionRecipe::can_produce`]
//! before touching a pool. Inputs are then removed in a single pass and each
//! output rolls its chance independently: outputs are separate Bernoulli
//! trials, not a weighted pick.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::pool::ResourcePool;
use crate::resource::Resource;
use crate::rng::SimRng;

// ---------------------------------------------------------------------------
// Recipe entries
// ---------------------------------------------------------------------------

/// An input requirement consumed once per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeInput {
    pub resource: Arc<Resource>,
    pub amount: f64,
}

/// An output product credited once per successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeOutput {
    pub resource: Arc<Resource>,
    pub amount: f64,
    /// Probability in `[0, 1]` that this output is produced.
    pub chance: f64,
}

// ---------------------------------------------------------------------------
// ProductionRecipe
// ---------------------------------------------------------------------------

/// A named transformation rule with a production time in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRecipe {
    id: String,
    name: String,
    description: String,
    production_time: f64,
    enabled: bool,
    inputs: BTreeMap<String, RecipeInput>,
    outputs: BTreeMap<String, RecipeOutput>,
}

impl ProductionRecipe {
    /// Create an enabled recipe with no inputs, no outputs, and a one
    /// second production time.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            production_time: 1.0,
            enabled: true,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_production_time(mut self, seconds: f64) -> Self {
        self.set_production_time(seconds);
        self
    }

    pub fn with_input(mut self, resource: Arc<Resource>, amount: f64) -> Self {
        self.add_input(resource, amount);
        self
    }

    pub fn with_output(mut self, resource: Arc<Resource>, amount: f64, chance: f64) -> Self {
        self.add_output(resource, amount, chance);
        self
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn production_time(&self) -> f64 {
        self.production_time
    }

    /// Set the cycle duration. Negative or NaN values become 0.
    pub fn set_production_time(&mut self, seconds: f64) {
        self.production_time = if seconds.is_nan() { 0.0 } else { seconds.max(0.0) };
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Require `amount` of `resource` per cycle, replacing any previous
    /// requirement for it.
    pub fn add_input(&mut self, resource: Arc<Resource>, amount: f64) {
        debug_assert!(amount > 0.0, "recipe input amount must be positive");
        if amount.is_nan() || amount <= 0.0 {
            return;
        }
        self.inputs
            .insert(resource.id().to_string(), RecipeInput { resource, amount });
    }

    pub fn remove_input(&mut self, resource_id: &str) -> bool {
        self.inputs.remove(resource_id).is_some()
    }

    /// Required amount per cycle, or 0 if the resource is not an input.
    pub fn input_amount(&self, resource_id: &str) -> f64 {
        self.inputs.get(resource_id).map(|i| i.amount).unwrap_or(0.0)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &RecipeInput> {
        self.inputs.values()
    }

    // -----------------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------------

    /// Produce `amount` of `resource` with probability `chance` (clamped to
    /// `[0, 1]`), replacing any previous output for it.
    pub fn add_output(&mut self, resource: Arc<Resource>, amount: f64, chance: f64) {
        debug_assert!(amount > 0.0, "recipe output amount must be positive");
        if amount.is_nan() || amount <= 0.0 {
            return;
        }
        let chance = if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) };
        self.outputs.insert(
            resource.id().to_string(),
            RecipeOutput {
                resource,
                amount,
                chance,
            },
        );
    }

    pub fn remove_output(&mut self, resource_id: &str) -> bool {
        self.outputs.remove(resource_id).is_some()
    }

    /// Amount per successful roll, or 0 if the resource is not an output.
    pub fn output_amount(&self, resource_id: &str) -> f64 {
        self.outputs.get(resource_id).map(|o| o.amount).unwrap_or(0.0)
    }

    /// Output probability, or 0 if the resource is not an output.
    pub fn output_chance(&self, resource_id: &str) -> f64 {
        self.outputs.get(resource_id).map(|o| o.chance).unwrap_or(0.0)
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &RecipeOutput> {
        self.outputs.values()
    }

    // -----------------------------------------------------------------------
    // Feasibility
    // -----------------------------------------------------------------------

    /// Whether one cycle's inputs are available in `pool`.
    pub fn can_produce(&self, pool: &ResourcePool) -> bool {
        self.enabled
            && self
                .inputs
                .values()
                .all(|input| pool.has(&input.resource, input.amount))
    }

    /// How many whole cycles `pool` can fund. `u32::MAX` when the recipe has
    /// no inputs, 0 when disabled.
    pub fn can_produce_count(&self, pool: &ResourcePool) -> u32 {
        if !self.enabled {
            return 0;
        }
        self.inputs
            .values()
            .map(|input| {
                let available =
                    (pool.get(&input.resource) - input.resource.min_value()).max(0.0);
                let cycles = (available / input.amount).floor();
                if cycles >= u32::MAX as f64 {
                    u32::MAX
                } else {
                    cycles as u32
                }
            })
            .min()
            .unwrap_or(u32::MAX)
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    /// Consume inputs from `pool` and credit rolled outputs back into it.
    pub fn produce(&self, pool: &mut ResourcePool, rng: &mut SimRng) -> bool {
        if !self.can_produce(pool) {
            return false;
        }
        self.consume_inputs(pool);
        for (resource, amount) in self.roll_outputs(rng) {
            pool.add(&resource, amount);
        }
        true
    }

    /// Like [`produce`](Self::produce) but every output is credited
    /// regardless of its chance.
    pub fn produce_guaranteed(&self, pool: &mut ResourcePool) -> bool {
        if !self.can_produce(pool) {
            return false;
        }
        self.consume_inputs(pool);
        for output in self.outputs.values() {
            pool.add(&output.resource, output.amount);
        }
        true
    }

    /// Consume inputs from `source` and credit rolled outputs into `dest`.
    pub fn produce_to_pool(
        &self,
        source: &mut ResourcePool,
        dest: &mut ResourcePool,
        rng: &mut SimRng,
    ) -> bool {
        if !self.can_produce(source) {
            return false;
        }
        self.consume_inputs(source);
        for (resource, amount) in self.roll_outputs(rng) {
            dest.add(&resource, amount);
        }
        true
    }

    /// Remove every input once. Callers must have checked availability.
    pub(crate) fn consume_inputs(&self, pool: &mut ResourcePool) {
        for input in self.inputs.values() {
            let removed = pool.remove(&input.resource, input.amount);
            debug_assert!(removed, "input {} vanished after check", input.resource.id());
        }
    }

    /// Return every input once, unscaled.
    pub(crate) fn refund_inputs(&self, pool: &mut ResourcePool) {
        for input in self.inputs.values() {
            pool.credit_unscaled(&input.resource, input.amount);
        }
    }

    /// Roll each output independently. Chances of 1.0 always succeed.
    pub(crate) fn roll_outputs(&self, rng: &mut SimRng) -> Vec<(Arc<Resource>, f64)> {
        self.outputs
            .values()
            .filter(|output| rng.chance(output.chance))
            .map(|output| (output.resource.clone(), output.amount))
            .collect()
    }
}
