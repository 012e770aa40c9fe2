//! Configuration schema for bbforge.toml
//!
//! Every section and key has a default, so an empty or absent file yields a
//! working configuration pointed at the KDE infrastructure.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use super::paths::expand_home;
use crate::error::ConfigError;

/// Root configuration structure for bbforge.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BbforgeConfig {
    /// Directory holding the metadata mirror and cache snapshots. Must exist.
    pub base_dir: PathBuf,
    pub upstream: UpstreamConfig,
    pub download: DownloadConfig,
    pub recipes: RecipesConfig,
    pub network: NetworkConfig,
}

impl Default for BbforgeConfig {
    fn default() -> Self {
        let base_dir = dirs::cache_dir()
            .map(|dir| dir.join("bbforge"))
            .unwrap_or_else(|| PathBuf::from(".bbforge"));
        Self {
            base_dir,
            upstream: UpstreamConfig::default(),
            download: DownloadConfig::default(),
            recipes: RecipesConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

/// `[upstream]`: the KDE project metadata backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Backend name used in cache file names and on the command line
    pub name: String,
    /// Release channel looked up in branch-rules.yml
    pub release: String,
    /// Branch used when no branch rule matches
    pub default_branch: String,
    pub gitlab_url: String,
    /// Sent as `PRIVATE-TOKEN` when non-empty
    pub access_token: String,
    pub metadata_repo: String,
    /// Prefix of the local mirror directory name
    pub mirror_name: String,
    /// Dependency declaration file, relative to the mirror root
    pub dependency_file: String,
    /// Extra project path to inherited class mappings, merged over the built-ins
    pub inherits: BTreeMap<String, String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            name: "kde-invent".to_string(),
            release: "@stable".to_string(),
            default_branch: "master".to_string(),
            gitlab_url: "https://invent.kde.org/".to_string(),
            access_token: String::new(),
            metadata_repo: "https://invent.kde.org/sysadmin/repo-metadata".to_string(),
            mirror_name: "kde-metadata".to_string(),
            dependency_file: "dependencies/dependency-data-kf5-qt5".to_string(),
            inherits: BTreeMap::new(),
        }
    }
}

impl UpstreamConfig {
    /// GitLab base URL with a trailing slash, so relative joins append.
    pub fn gitlab_base(&self) -> Result<Url, ConfigError> {
        let mut raw = self.gitlab_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("upstream.gitlab_url '{}': {e}", self.gitlab_url)))
    }

    pub fn token(&self) -> Option<&str> {
        let token = self.access_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// `[download]`: the release artifact mirror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Plain-text recursive directory listing (`ls -lR` output)
    pub listing_url: String,
    pub base_url: String,
    /// Server-side path prefix removed from listing directories
    pub strip_prefix: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://download.kde.org/ls-lR".to_string(),
            base_url: "https://download.kde.org/".to_string(),
            strip_prefix: "/srv/archives/ftp/".to_string(),
        }
    }
}

/// `[recipes]`: local layers and output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipesConfig {
    /// Layer roots scanned for existing recipes
    pub layers: Vec<PathBuf>,
    /// Layer that receives generated recipes
    pub layer_directory: PathBuf,
    /// Directory holding recipe-main.tmpl and recipe-include.tmpl
    pub template_dir: PathBuf,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            layers: vec![PathBuf::from(".")],
            layer_directory: PathBuf::from("."),
            template_dir: PathBuf::from("templates"),
        }
    }
}

/// `[network]`: timeouts, retries and fetch parallelism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    /// Attempts per request, including the first
    pub max_retries: u32,
    /// Backoff base; doubles on each retry
    pub retry_delay_ms: u64,
    /// Worker threads for per-project auxiliary fetches
    pub concurrency: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 500,
            concurrency: 4,
        }
    }
}

impl BbforgeConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.concurrency == 0 {
            return Err(ConfigError::Invalid("network.concurrency must be at least 1".into()));
        }
        if self.network.max_retries == 0 {
            return Err(ConfigError::Invalid("network.max_retries must be at least 1".into()));
        }
        if self.upstream.name.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.name must not be empty".into()));
        }
        if self.upstream.release.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.release must not be empty".into()));
        }
        if self.upstream.default_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.default_branch must not be empty".into()));
        }

        self.upstream.gitlab_base()?;
        for (key, value) in [
            ("download.listing_url", &self.download.listing_url),
            ("download.base_url", &self.download.base_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::Invalid(format!("{key} '{value}': {e}")))?;
        }

        Ok(())
    }

    /// Expand a leading `~` in every path setting.
    pub fn expand_paths(mut self) -> Self {
        self.base_dir = expand_home(&self.base_dir);
        self.recipes.layers = self.recipes.layers.iter().map(|p| expand_home(p)).collect();
        self.recipes.layer_directory = expand_home(&self.recipes.layer_directory);
        self.recipes.template_dir = expand_home(&self.recipes.template_dir);
        self
    }
}
