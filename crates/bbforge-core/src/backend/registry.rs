//! Backend registry dispatching lifecycle and lookups.
//!
//! Backends are kept in registration order, which is the processing order
//! of every fan-out. A failing backend never prevents the others from
//! running.

use tracing::{debug, error, trace, warn};

use super::Backend;
use crate::error::{BackendError, FatalError, RegistryError};
use crate::types::RecipeSource;

/// Which backends a lifecycle fan-out ran, and how each ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl LoadReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. A backend with the same name is replaced in place.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        match self.backends.iter().position(|b| b.name() == backend.name()) {
            Some(idx) => {
                warn!(backend = backend.name(), "Replacing registered backend");
                self.backends[idx] = backend;
            }
            None => self.backends.push(backend),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn all(&self) -> &[Box<dyn Backend>] {
        &self.backends
    }

    /// Initialize every backend, logging failures.
    pub fn init(&mut self) {
        for backend in &mut self.backends {
            match backend.init() {
                Ok(()) => debug!(backend = backend.name(), "Backend initialized"),
                Err(e) => error!(backend = backend.name(), error = %e, "Backend failed to initialize"),
            }
        }
    }

    /// Reload cached snapshots of every ready backend.
    pub fn load_cache(&mut self) -> Result<LoadReport, FatalError> {
        self.for_each_ready("load cache", |backend| backend.load_cache())
    }

    /// Refresh every ready backend from upstream.
    pub fn load_source(&mut self) -> Result<LoadReport, FatalError> {
        self.for_each_ready("load source", |backend| backend.load_source())
    }

    /// Run `op` on every ready backend. Recoverable failures are logged and
    /// listed in the report; the first fatal failure is returned after all
    /// backends have run.
    fn for_each_ready(
        &mut self,
        action: &str,
        mut op: impl FnMut(&mut dyn Backend) -> Result<(), BackendError>,
    ) -> Result<LoadReport, FatalError> {
        let mut report = LoadReport::default();
        let mut first_fatal = None;

        for backend in &mut self.backends {
            let name = backend.name().to_string();
            if !backend.ready() {
                trace!(backend = %name, action, "Skipping backend that is not ready");
                report.skipped.push(name);
                continue;
            }
            match op(backend.as_mut()) {
                Ok(()) => {
                    debug!(backend = %name, action, "Backend finished");
                    report.succeeded.push(name);
                }
                Err(BackendError::Fatal(e)) => {
                    error!(backend = %name, action, error = %e, "Backend failed fatally");
                    first_fatal.get_or_insert(e);
                    report.failed.push(name);
                }
                Err(e) => {
                    error!(backend = %name, action, error = %e, "Backend failed");
                    report.failed.push(name);
                }
            }
        }

        match first_fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Search every ready backend. A failing backend contributes nothing.
    pub fn search_source(&self, keyword: &str) -> Vec<RecipeSource> {
        let mut results = Vec::new();
        for backend in &self.backends {
            if !backend.ready() {
                trace!(backend = backend.name(), "Skipping backend that is not ready");
                continue;
            }
            match backend.search_source(keyword) {
                Ok(found) => {
                    debug!(backend = backend.name(), keyword, count = found.len(), "Search finished");
                    results.extend(found);
                }
                Err(e) => error!(backend = backend.name(), keyword, error = %e, "Search failed"),
            }
        }
        results
    }

    /// Fetch one enriched recipe from the named backend.
    pub fn get_recipe(&self, backend: &str, identifier: &str) -> Result<RecipeSource, RegistryError> {
        let found = self
            .get(backend)
            .ok_or_else(|| RegistryError::BackendNotFound(backend.to_string()))?;

        found.get_recipe(identifier).map_err(|e| {
            debug!(backend, identifier, error = %e, "Recipe lookup failed");
            RegistryError::RecipeNotFound {
                backend: backend.to_string(),
                identifier: identifier.to_string(),
            }
        })
    }
}
