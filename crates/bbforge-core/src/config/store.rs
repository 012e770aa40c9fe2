//! Config store for locating and loading bbforge.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::paths::config_candidates;
use super::{BbforgeConfig, parser};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: Option<PathBuf>,
}

impl ConfigStore {
    /// Resolve the config file: `explicit`, else `./bbforge.toml`, else the
    /// user config directory. An explicit path must exist.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        let config_path = config_candidates(explicit, &cwd)
            .into_iter()
            .find(|candidate| candidate.exists());
        Ok(Self { config_path })
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load the configuration; no config file means defaults.
    pub fn load(&self) -> anyhow::Result<BbforgeConfig> {
        match &self.config_path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                parser::parse_bbforge_toml(path)
                    .with_context(|| format!("Failed to load config file: {}", path.display()))
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok(BbforgeConfig::new().expand_paths())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bbforge.toml");
        std::fs::write(&path, "[upstream]\nname = \"kde-test\"\n").unwrap();

        let config = ConfigStore::from_path(&path).load().unwrap();
        assert_eq!(config.upstream.name, "kde-test");
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.toml");
        assert!(ConfigStore::discover(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bbforge.toml");
        std::fs::write(&path, "base_dir = [").unwrap();

        let err = ConfigStore::from_path(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("bbforge.toml"));
    }
}
