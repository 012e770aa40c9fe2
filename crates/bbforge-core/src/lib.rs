//! bbforge Core Library
//!
//! Generates BitBake recipes from upstream project metadata: backends ingest
//! and cache metadata, parsers normalize per-project files, and the recipe
//! synthesizer renders `.bb`/`.inc` files into a layer.

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod net;
pub mod parser;
pub mod prompt;
pub mod recipe;
pub mod types;
pub mod upstream;
pub mod version;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{BbforgeConfig, ConfigStore};

    // Context
    pub use crate::context::AppContext;

    // Backends
    pub use crate::backend::{Backend, BackendRegistry, LoadReport};
    pub use crate::upstream::UpstreamBackend;

    // Errors
    pub use crate::error::{BackendError, FatalError, RecipeError, RegistryError};

    // Recipes
    pub use crate::recipe::{CreatedRecipe, RecipeSynthesizer};
    pub use crate::types::RecipeSource;

    // Interaction
    pub use crate::net::CancellationToken;
    pub use crate::prompt::{NonInteractive, Prompt};
}
