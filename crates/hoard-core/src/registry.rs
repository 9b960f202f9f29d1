use std::collections::BTreeMap;
use std::sync::Arc;

use crate::recipe::ProductionRecipe;
use crate::resource::Resource;

/// Builder for constructing an immutable [`Registry`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    resources: BTreeMap<String, Arc<Resource>>,
    recipes: BTreeMap<String, ProductionRecipe>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a resource. Returns the shared handle recipes
    /// should reference.
    pub fn register_resource(&mut self, resource: Resource) -> Result<Arc<Resource>, RegistryError> {
        if self.resources.contains_key(resource.id()) {
            return Err(RegistryError::DuplicateId(resource.id().to_string()));
        }
        if !(resource.min_value() <= resource.max_value()) {
            return Err(RegistryError::InvalidBounds {
                resource: resource.id().to_string(),
                min: resource.min_value(),
                max: resource.max_value(),
            });
        }
        let resource = Arc::new(resource);
        self.resources
            .insert(resource.id().to_string(), resource.clone());
        Ok(resource)
    }

    /// Phase 1: Register a recipe.
    pub fn register_recipe(&mut self, recipe: ProductionRecipe) -> Result<(), RegistryError> {
        if self.recipes.contains_key(recipe.id()) {
            return Err(RegistryError::DuplicateId(recipe.id().to_string()));
        }
        self.recipes.insert(recipe.id().to_string(), recipe);
        Ok(())
    }

    /// Phase 2: Mutate an existing recipe by id.
    pub fn mutate_recipe<F>(&mut self, id: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut ProductionRecipe),
    {
        let recipe = self
            .recipes
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        f(recipe);
        Ok(())
    }

    pub fn resource(&self, id: &str) -> Option<&Arc<Resource>> {
        self.resources.get(id)
    }

    pub fn recipe(&self, id: &str) -> Option<&ProductionRecipe> {
        self.recipes.get(id)
    }

    /// Phase 3: Finalize and build the immutable registry.
    ///
    /// Every recipe input and output must name a registered resource; the
    /// recipe is rebound to the registered handle so all users share it.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut recipes = BTreeMap::new();
        for (id, mut recipe) in self.recipes {
            let inputs: Vec<_> = recipe
                .inputs()
                .map(|i| (i.resource.id().to_string(), i.amount))
                .collect();
            let outputs: Vec<_> = recipe
                .outputs()
                .map(|o| (o.resource.id().to_string(), o.amount, o.chance))
                .collect();

            let lookup = |resource: &str| {
                self.resources
                    .get(resource)
                    .cloned()
                    .ok_or_else(|| RegistryError::UnknownResource {
                        recipe: id.clone(),
                        resource: resource.to_string(),
                    })
            };
            for (resource, amount) in inputs {
                recipe.add_input(lookup(&resource)?, amount);
            }
            for (resource, amount, chance) in outputs {
                recipe.add_output(lookup(&resource)?, amount, chance);
            }
            recipes.insert(id, Arc::new(recipe));
        }

        Ok(Registry {
            resources: self.resources,
            recipes,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug, Default)]
pub struct Registry {
    resources: BTreeMap<String, Arc<Resource>>,
    recipes: BTreeMap<String, Arc<ProductionRecipe>>,
}

impl Registry {
    pub fn resource(&self, id: &str) -> Option<&Arc<Resource>> {
        self.resources.get(id)
    }

    pub fn recipe(&self, id: &str) -> Option<&Arc<ProductionRecipe>> {
        self.recipes.get(id)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Resources in id order.
    pub fn resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    /// Recipes in id order.
    pub fn recipes(&self) -> impl Iterator<Item = &Arc<ProductionRecipe>> {
        self.recipes.values()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("recipe '{recipe}' references unknown resource '{resource}'")]
    UnknownResource { recipe: String, resource: String },
    #[error("resource '{resource}' has invalid bounds [{min}, {max}]")]
    InvalidBounds { resource: String, min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> RegistryBuilder {
        let mut b = RegistryBuilder::new();
        let wood = b.register_resource(Resource::new("wood")).unwrap();
        let plank = b.register_resource(Resource::new("plank")).unwrap();
        b.register_recipe(
            ProductionRecipe::new("saw")
                .with_production_time(5.0)
                .with_input(wood, 2.0)
                .with_output(plank, 1.0, 1.0),
        )
        .unwrap();
        b
    }

    #[test]
    fn register_and_build() {
        let reg = setup_builder().build().unwrap();
        assert_eq!(reg.resource_count(), 2);
        assert_eq!(reg.recipe_count(), 1);
    }

    #[test]
    fn lookup_by_id() {
        let reg = setup_builder().build().unwrap();
        assert!(reg.resource("wood").is_some());
        assert!(reg.resource("nonexistent").is_none());
        assert_eq!(reg.recipe("saw").unwrap().production_time(), 5.0);
    }

    #[test]
    fn iteration_is_id_ordered() {
        let reg = setup_builder().build().unwrap();
        let ids: Vec<_> = reg.resources().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["plank", "wood"]);
    }

    #[test]
    fn mutate_recipe() {
        let mut builder = setup_builder();
        let nails = builder.register_resource(Resource::new("nails")).unwrap();
        builder
            .mutate_recipe("saw", |recipe| recipe.add_input(nails, 4.0))
            .unwrap();
        let reg = builder.build().unwrap();
        assert_eq!(reg.recipe("saw").unwrap().input_count(), 2);
    }

    #[test]
    fn mutate_nonexistent_fails() {
        let mut builder = setup_builder();
        let result = builder.mutate_recipe("nonexistent", |_| {});
        assert!(matches!(result, Err(RegistryError::NotFound(id)) if id == "nonexistent"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut b = setup_builder();
        assert!(matches!(
            b.register_resource(Resource::new("wood")),
            Err(RegistryError::DuplicateId(_))
        ));
        assert!(matches!(
            b.register_recipe(ProductionRecipe::new("saw")),
            Err(RegistryError::DuplicateId(_))
        ));
    }

    #[test]
    fn nan_bounds_rejected() {
        let mut b = RegistryBuilder::new();
        let result = b.register_resource(Resource::new("void").with_bounds(f64::NAN, 1.0));
        assert!(matches!(result, Err(RegistryError::InvalidBounds { .. })));
    }

    #[test]
    fn unknown_resource_in_recipe_fails() {
        let mut b = RegistryBuilder::new();
        b.register_recipe(
            ProductionRecipe::new("bad").with_output(Arc::new(Resource::new("ghost")), 1.0, 1.0),
        )
        .unwrap();
        match b.build() {
            Err(RegistryError::UnknownResource { recipe, resource }) => {
                assert_eq!(recipe, "bad");
                assert_eq!(resource, "ghost");
            }
            other => panic!("expected UnknownResource, got: {other:?}"),
        }
    }

    #[test]
    fn recipes_share_registered_resources() {
        let mut b = RegistryBuilder::new();
        let ore = b.register_resource(Resource::new("ore")).unwrap();
        // A recipe built against a detached copy is rebound on build.
        b.register_recipe(
            ProductionRecipe::new("dig").with_output(Arc::new(Resource::new("ore")), 1.0, 1.0),
        )
        .unwrap();
        let reg = b.build().unwrap();
        let out = reg.recipe("dig").unwrap().outputs().next().unwrap().resource.clone();
        assert!(Arc::ptr_eq(&out, &ore));
    }

    #[test]
    fn error_messages() {
        let msg = RegistryError::UnknownResource {
            recipe: "saw".into(),
            resource: "oak".into(),
        }
        .to_string();
        assert!(msg.contains("unknown resource 'oak'"), "got: {msg}");
    }
}
