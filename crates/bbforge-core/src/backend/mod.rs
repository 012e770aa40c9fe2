//! Backend abstraction over upstream metadata sources.

pub mod registry;

use std::fmt;

pub use registry::{BackendRegistry, LoadReport};

use crate::error::BackendError;
use crate::types::RecipeSource;

/// A named source of recipe metadata.
///
/// Lifecycle: `init` once, then either `load_cache` (offline) or
/// `load_source` (live refresh). Lookups only see the last loaded snapshot.
pub trait Backend: fmt::Debug + Send {
    /// Stable name used on the command line and in cache file names.
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<(), BackendError>;

    fn ready(&self) -> bool;

    /// Reload the last committed snapshot without network access.
    fn load_cache(&mut self) -> Result<(), BackendError>;

    /// Rebuild from upstream and commit a new snapshot.
    fn load_source(&mut self) -> Result<(), BackendError>;

    /// Un-enriched projects whose name or description contains `keyword`.
    fn search_source(&self, keyword: &str) -> Result<Vec<RecipeSource>, BackendError>;

    /// Fully enriched descriptor for one identifier.
    fn get_recipe(&self, identifier: &str) -> Result<RecipeSource, BackendError>;
}
