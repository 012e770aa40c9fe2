//! Shared core types used across backends and the recipe synthesizer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Canonical, backend-agnostic descriptor of a buildable package.
///
/// Produced by a backend's enrichment step, or as the un-enriched base view
/// of a project for search results. Field names are the names templates see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSource {
    pub name: String,
    /// Unique key within the owning backend.
    pub identifier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Upstream repository URL.
    #[serde(default)]
    pub url: String,
    /// Grouping path, rendered into `recipes-<section>`.
    #[serde(default)]
    pub section: String,
    pub backend: String,
    /// Inherited capability (BitBake class) names, in resolution order.
    #[serde(default)]
    pub inherits: Vec<String>,
    /// Identifiers of recipes this one depends on.
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub src_uri: Option<String>,
    #[serde(default)]
    pub src_sha256: Option<String>,
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub location: Option<PathBuf>,
}

impl RecipeSource {
    /// Case-insensitive substring match on name or description.
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.name.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
    }
}
