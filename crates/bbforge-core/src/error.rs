//! Typed errors for every caller-facing operation.
//!
//! Library code never terminates the process. Unrecoverable conditions are
//! surfaced as [`FatalError`] and the CLI decides how to exit.

use std::io;
use std::path::PathBuf;

/// Unrecoverable failure while initializing or refreshing a backend.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("base directory does not exist: {}", .0.display())]
    MissingBaseDir(PathBuf),

    #[error("failed to open or clone metadata repository {url} into {}", path.display())]
    Mirror {
        url: String,
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("failed to read branch rules {}", path.display())]
    BranchRulesRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed branch rules {}", path.display())]
    BranchRulesParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("release '{0}' is not defined in the branch rules")]
    UnknownRelease(String),
}

/// Failure of a single HTTP operation, after retries where applicable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt may succeed: transport errors, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no parser named '{0}' is registered")]
    UnknownParser(String),

    #[error("parser '{0}' is not initialized")]
    NotReady(String),

    #[error("payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no download artifact for {name} {version}")]
    NotFound { name: String, version: String },

    #[error("failed to fetch {url}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to read cache file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write cache file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed cache file {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize cache snapshot '{name}'")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache file {} has schema version {found}, expected {expected}", path.display())]
    SchemaMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// Failure reported by a single backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("backend '{0}' is not ready")]
    NotReady(String),

    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to refresh the download index")]
    DownloadIndex(#[source] IndexError),

    #[error("failed to start the fetch worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("refresh cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("backend '{0}' not found")]
    BackendNotFound(String),

    #[error("recipe '{identifier}' not found in backend '{backend}'")]
    RecipeNotFound { backend: String, identifier: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("backend '{0}' not found")]
    BackendNotFound(String),

    #[error("backend '{0}' is not ready")]
    BackendNotReady(String),

    #[error("recipe '{identifier}' not found in backend '{backend}'")]
    RecipeNotFound { backend: String, identifier: String },

    #[error("recipe '{identifier}' already exists at {}", location.display())]
    AlreadyExists {
        identifier: String,
        location: PathBuf,
    },

    #[error("recipe '{identifier}' depends on '{dependency}', which has no recipe yet")]
    DependencyMissing {
        identifier: String,
        dependency: String,
    },

    #[error("recipe '{0}' has no version")]
    MissingVersion(String),

    #[error("failed to read template {}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to compile template '{name}'")]
    TemplateCompile {
        name: String,
        #[source]
        source: upon::Error,
    },

    #[error("failed to render template '{name}'")]
    Render {
        name: String,
        #[source]
        source: upon::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<RegistryError> for RecipeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::BackendNotFound(name) => RecipeError::BackendNotFound(name),
            RegistryError::RecipeNotFound {
                backend,
                identifier,
            } => RecipeError::RecipeNotFound {
                backend,
                identifier,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
