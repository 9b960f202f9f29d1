//! Data-driven registry loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`RegistryBuilder`] for game content defined in data files. The schema
//! types are plain serde structs so other front ends (RON, TOML) can reuse
//! [`build_registry`].

use serde::{Deserialize, Serialize};

use crate::recipe::ProductionRecipe;
use crate::registry::{RegistryBuilder, RegistryError};
use crate::resource::{Resource, ResourceCategory};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("recipe '{recipe}' references unknown resource '{resource}'")]
    UnknownResourceRef { recipe: String, resource: String },
    #[error("recipe '{recipe}' has non-positive amount {amount} for '{resource}'")]
    InvalidAmount {
        recipe: String,
        resource: String,
        amount: f64,
    },
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Top-level registry data structure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegistryData {
    #[serde(default)]
    pub resources: Vec<ResourceData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
}

/// Serialized resource definition. A missing `max_value` means unbounded.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub category: ResourceCategory,
    #[serde(default)]
    pub min_value: f64,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub decimal_places: u8,
    #[serde(default)]
    pub hidden: bool,
}

/// Serialized recipe definition.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_production_time")]
    pub production_time: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub inputs: Vec<RecipeInputData>,
    #[serde(default)]
    pub outputs: Vec<RecipeOutputData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeInputData {
    pub resource: String, // references resource by id
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeOutputData {
    pub resource: String,
    pub amount: f64,
    #[serde(default = "default_chance")]
    pub chance: f64,
}

fn default_production_time() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_chance() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a registry from a JSON string.
pub fn load_registry_json(json: &str) -> Result<RegistryBuilder, DataLoadError> {
    let data: RegistryData = serde_json::from_str(json)?;
    build_registry(data)
}

/// Load a registry from JSON bytes.
pub fn load_registry_json_bytes(bytes: &[u8]) -> Result<RegistryBuilder, DataLoadError> {
    let data: RegistryData = serde_json::from_slice(bytes)?;
    build_registry(data)
}

fn to_resource(data: ResourceData) -> Resource {
    let mut resource = Resource::new(data.id)
        .with_category(data.category)
        .with_bounds(data.min_value, data.max_value.unwrap_or(f64::INFINITY))
        .with_decimal_places(data.decimal_places)
        .with_hidden(data.hidden);
    if let Some(name) = data.name {
        resource.set_name(name);
    }
    resource.set_description(data.description);
    resource.set_icon(data.icon);
    resource
}

fn check_amount(recipe: &str, resource: &str, amount: f64) -> Result<(), DataLoadError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(DataLoadError::InvalidAmount {
            recipe: recipe.to_string(),
            resource: resource.to_string(),
            amount,
        })
    }
}

/// Register every resource, then every recipe with its resource references
/// resolved by id.
pub fn build_registry(data: RegistryData) -> Result<RegistryBuilder, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    // Phase 1: Register all resources
    for resource in data.resources {
        builder.register_resource(to_resource(resource))?;
    }

    // Phase 2: Register all recipes (resolve resource refs by id)
    for entry in data.recipes {
        let mut recipe = ProductionRecipe::new(entry.id.as_str())
            .with_production_time(entry.production_time);
        if let Some(name) = entry.name {
            recipe.set_name(name);
        }
        recipe.set_description(entry.description);
        recipe.set_enabled(entry.enabled);

        let lookup = |builder: &RegistryBuilder, resource: &str| {
            builder
                .resource(resource)
                .cloned()
                .ok_or_else(|| DataLoadError::UnknownResourceRef {
                    recipe: entry.id.clone(),
                    resource: resource.to_string(),
                })
        };

        for input in &entry.inputs {
            check_amount(&entry.id, &input.resource, input.amount)?;
            recipe.add_input(lookup(&builder, &input.resource)?, input.amount);
        }
        for output in &entry.outputs {
            check_amount(&entry.id, &output.resource, output.amount)?;
            recipe.add_output(lookup(&builder, &output.resource)?, output.amount, output.chance);
        }

        builder.register_recipe(recipe)?;
    }

    Ok(builder)
}

// ===========================================================================
// Tests
// ===========================================================================
