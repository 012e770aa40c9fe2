//! Application context for unified dependency injection.

use std::sync::Arc;

use anyhow::Context;

use crate::backend::BackendRegistry;
use crate::cache::CacheStore;
use crate::config::BbforgeConfig;
use crate::error::FatalError;
use crate::net::{CancellationToken, HttpClient};
use crate::prompt::Prompt;
use crate::recipe::RecipeSynthesizer;
use crate::upstream::{GitLabApi, UpstreamBackend};

/// Shared services built from one loaded configuration.
///
/// Frontends create this once and derive the registry and synthesizer from
/// it. Every network client built here shares the same cancellation token.
#[derive(Clone)]
pub struct AppContext {
    config: BbforgeConfig,
    cancel: CancellationToken,
    prompt: Arc<dyn Prompt>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("base_dir", &self.config.base_dir)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Create a context. The base directory must already exist.
    pub fn new(config: BbforgeConfig, prompt: Arc<dyn Prompt>) -> Result<Self, FatalError> {
        if !config.base_dir.is_dir() {
            return Err(FatalError::MissingBaseDir(config.base_dir.clone()));
        }
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
            prompt,
        })
    }

    pub fn config(&self) -> &BbforgeConfig {
        &self.config
    }

    /// Token tripped by the frontend to stop in-flight refreshes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn http_client(&self) -> anyhow::Result<HttpClient> {
        HttpClient::from_config(&self.config.network, self.cancel.clone())
            .context("Failed to build HTTP client")
    }

    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(&self.config.base_dir)
    }

    /// Registry with every configured backend registered and initialized.
    pub fn backend_registry(&self) -> anyhow::Result<BackendRegistry> {
        let http = self.http_client()?;
        let upstream = &self.config.upstream;
        let gitlab = upstream.gitlab_base()?;
        let api = GitLabApi::new(&gitlab, upstream.token().map(str::to_string), http.clone())
            .with_context(|| format!("Invalid GitLab URL: {}", gitlab))?;

        let backend = UpstreamBackend::new(&self.config, Arc::new(api), http, self.prompt.clone())?;

        let mut registry = BackendRegistry::new();
        registry.register(Box::new(backend));
        registry.init();
        Ok(registry)
    }

    pub fn recipe_synthesizer<'a>(&self, registry: &'a BackendRegistry) -> RecipeSynthesizer<'a> {
        RecipeSynthesizer::new(registry, &self.config.recipes)
    }
}
