//! Recipe synthesis: turns an enriched [`RecipeSource`] into a `.bb` recipe
//! and its `.inc` include inside a BitBake layer.
//!
//! Generation is refused when the identifier is already materialized in one
//! of the scanned layers, or when any of its dependencies is not.

pub mod render;
pub mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use render::{INCLUDE_TEMPLATE, MAIN_TEMPLATE, RecipeRenderer, RenderedRecipe};
pub use scan::{ExistingRecipe, RecipeIndex};

use crate::backend::BackendRegistry;
use crate::config::RecipesConfig;
use crate::error::RecipeError;
use crate::types::RecipeSource;

/// Files written by a successful [`RecipeSynthesizer::create_recipe`].
#[derive(Debug, Clone)]
pub struct CreatedRecipe {
    pub recipe: RecipeSource,
    pub recipe_path: PathBuf,
    pub include_path: PathBuf,
}

pub struct RecipeSynthesizer<'a> {
    registry: &'a BackendRegistry,
    layers: Vec<PathBuf>,
    layer_directory: PathBuf,
    template_dir: PathBuf,
    existing: Option<RecipeIndex>,
}

impl<'a> RecipeSynthesizer<'a> {
    pub fn new(registry: &'a BackendRegistry, config: &RecipesConfig) -> Self {
        Self {
            registry,
            layers: config.layers.clone(),
            layer_directory: config.layer_directory.clone(),
            template_dir: config.template_dir.clone(),
            existing: None,
        }
    }

    /// Write new recipes under `dir` instead of the configured layer.
    pub fn with_layer_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layer_directory = dir.into();
        self
    }

    pub fn layer_directory(&self) -> &Path {
        &self.layer_directory
    }

    /// Recipes found in the configured layers, scanned on first use.
    pub fn existing(&mut self) -> &RecipeIndex {
        let layers = &self.layers;
        self.existing.get_or_insert_with(|| RecipeIndex::scan(layers))
    }

    /// Generate the recipe for `identifier` from `backend`.
    ///
    /// Both files are rendered before anything is written. If writing the
    /// include fails, the recipe file written by this call is removed.
    pub fn create_recipe(
        &mut self,
        backend: &str,
        identifier: &str,
    ) -> Result<CreatedRecipe, RecipeError> {
        let found = self
            .registry
            .get(backend)
            .ok_or_else(|| RecipeError::BackendNotFound(backend.to_string()))?;
        if !found.ready() {
            return Err(RecipeError::BackendNotReady(backend.to_string()));
        }

        self.existing();
        let recipe = self.registry.get_recipe(backend, identifier)?;
        let existing = self.existing.get_or_insert_with(RecipeIndex::new);

        if let Some(present) = existing.get(&recipe.identifier) {
            return Err(RecipeError::AlreadyExists {
                identifier: recipe.identifier.clone(),
                location: present.location.clone(),
            });
        }

        if let Some(missing) = recipe.depends.iter().find(|dep| !existing.contains(dep)) {
            return Err(RecipeError::DependencyMissing {
                identifier: recipe.identifier.clone(),
                dependency: missing.clone(),
            });
        }

        let version = recipe
            .version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RecipeError::MissingVersion(recipe.identifier.clone()))?;

        let renderer = RecipeRenderer::from_dir(&self.template_dir)?;
        let rendered = renderer.render(&recipe)?;

        let target_dir = self
            .layer_directory
            .join(format!("recipes-{}", recipe.section))
            .join(&recipe.identifier);
        fs::create_dir_all(&target_dir).map_err(|source| RecipeError::Write {
            path: target_dir.clone(),
            source,
        })?;

        let recipe_path = target_dir.join(format!("{}_{}.bb", recipe.identifier, version));
        let include_path = target_dir.join(format!("{}.inc", recipe.identifier));

        write_file(&recipe_path, &rendered.recipe)?;
        if let Err(e) = write_file(&include_path, &rendered.include) {
            if let Err(cleanup) = fs::remove_file(&recipe_path) {
                warn!(path = %recipe_path.display(), error = %cleanup, "Failed to remove partial recipe");
            }
            return Err(e);
        }

        info!(
            backend,
            identifier = %recipe.identifier,
            path = %recipe_path.display(),
            "Recipe created"
        );

        existing.insert(ExistingRecipe {
            identifier: recipe.identifier.clone(),
            version,
            location: recipe_path.clone(),
        });

        Ok(CreatedRecipe {
            recipe,
            recipe_path,
            include_path,
        })
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), RecipeError> {
    debug!(path = %path.display(), "Writing recipe file");
    fs::write(path, content).map_err(|source| RecipeError::Write {
        path: path.to_path_buf(),
        source,
    })
}
