//! Discovery of recipes already present in local layers.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::Pattern;
use regex::Regex;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

static RECIPE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*)_(.*)\.bb$").expect("valid recipe file regex"));

static RECIPES_DIR: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new("recipes-*").expect("valid recipes directory glob"));

/// A `<identifier>_<version>.bb` found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingRecipe {
    pub identifier: String,
    pub version: String,
    pub location: PathBuf,
}

/// Identifiers with a materialized recipe, first occurrence kept.
#[derive(Debug, Clone, Default)]
pub struct RecipeIndex {
    recipes: BTreeMap<String, ExistingRecipe>,
}

impl RecipeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every layer root, in order.
    pub fn scan<P: AsRef<Path>>(layers: &[P]) -> Self {
        let mut index = Self::new();
        for layer in layers {
            index.scan_layer(layer.as_ref());
        }
        index
    }

    /// Add the recipes under `layer`. Only top-level `recipes-*` directories
    /// are searched; unreadable entries are skipped.
    pub fn scan_layer(&mut self, layer: &Path) {
        debug!(layer = %layer.display(), "Scanning layer for existing recipes");
        let walker = WalkDir::new(layer)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() != 1
                    || !entry.file_type().is_dir()
                    || entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| RECIPES_DIR.matches(name))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(layer = %layer.display(), error = %e, "Skipping unreadable path");
                    continue;
                }
            };
            if entry.depth() < 2 || !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(caps) = RECIPE_FILE.captures(name) {
                self.insert(ExistingRecipe {
                    identifier: caps[1].to_string(),
                    version: caps[2].to_string(),
                    location: entry.path().to_path_buf(),
                });
            }
        }
    }

    /// Record a recipe unless its identifier is already known.
    pub fn insert(&mut self, recipe: ExistingRecipe) {
        match self.recipes.entry(recipe.identifier.clone()) {
            Entry::Occupied(existing) => trace!(
                identifier = %recipe.identifier,
                kept = %existing.get().location.display(),
                ignored = %recipe.location.display(),
                "Recipe already indexed"
            ),
            Entry::Vacant(slot) => {
                slot.insert(recipe);
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&ExistingRecipe> {
        self.recipes.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.recipes.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
