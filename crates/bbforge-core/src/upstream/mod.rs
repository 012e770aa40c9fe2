//! KDE project metadata backend.
//!
//! Ingestion mirrors the metadata repository, reads branch rules and the
//! dependency declarations, walks every `metadata.yaml`, and fetches each
//! project's `.kde-ci.yml` and AppStream file from GitLab. The result is one
//! immutable [`Snapshot`], committed to the cache as four files and swapped in
//! only after the commit succeeds.

mod branch_rules;
mod dependencies;
mod enrich;
mod ingest;
mod inherits;
mod mirror;
mod project;
mod remote;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{error, info, trace, warn};
use url::Url;

pub use branch_rules::{BranchRule, BranchRules};
pub use dependencies::DependencyGraph;
pub use inherits::{BASELINE_INHERIT, InheritsResolver, Resolved};
pub use mirror::MetadataMirror;
pub use project::{
    AppStreamMetadata, BranchMetadata, Bugzilla, CiDepsMetadata, FALLBACK_SECTION, Project,
    ProjectDescriptor, ProjectMetadata,
};
pub use remote::{GitLabApi, RemoteApi, TreeEntry};

use crate::backend::Backend;
use crate::cache::{CacheStore, PendingSnapshot};
use crate::config::{BbforgeConfig, DownloadConfig};
use crate::download::DownloadIndex;
use crate::error::{BackendError, CacheError, ConfigError, FatalError};
use crate::net::{CancellationToken, HttpClient};
use crate::parser::ParserRegistry;
use crate::prompt::Prompt;
use crate::types::RecipeSource;

const PROJECTS_CACHE: &str = "cache";
const DEPENDENCY_CACHE: &str = "dep-cache";
const BRANCH_CACHE: &str = "branch-cache";
const DOWNLOAD_CACHE: &str = "download-cache";

/// Everything one ingestion pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub projects: BTreeMap<String, Project>,
    pub dependencies: DependencyGraph,
    pub branch_rules: BranchRules,
    pub downloads: DownloadIndex,
}

pub struct UpstreamBackend {
    name: String,
    release: String,
    default_branch: String,
    dependency_file: String,
    gitlab: Url,
    concurrency: usize,
    download: DownloadConfig,
    mirror: MetadataMirror,
    remote: Arc<dyn RemoteApi>,
    http: HttpClient,
    cancel: CancellationToken,
    parsers: ParserRegistry,
    inherits: InheritsResolver,
    cache: CacheStore,
    prompt: Arc<dyn Prompt>,
    snapshot: Arc<Snapshot>,
    ready: bool,
}

impl fmt::Debug for UpstreamBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamBackend")
            .field("name", &self.name)
            .field("release", &self.release)
            .field("mirror", &self.mirror)
            .field("projects", &self.snapshot.projects.len())
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

impl UpstreamBackend {
    /// Build the backend from configuration. Cache files and the mirror live
    /// in `base_dir`; `http` carries the cancellation token for the backend.
    pub fn new(
        config: &BbforgeConfig,
        remote: Arc<dyn RemoteApi>,
        http: HttpClient,
        prompt: Arc<dyn Prompt>,
    ) -> Result<Self, ConfigError> {
        let upstream = &config.upstream;
        Ok(Self {
            name: upstream.name.clone(),
            release: upstream.release.clone(),
            default_branch: upstream.default_branch.clone(),
            dependency_file: upstream.dependency_file.clone(),
            gitlab: upstream.gitlab_base()?,
            concurrency: config.network.concurrency.max(1),
            download: config.download.clone(),
            mirror: MetadataMirror::new(&upstream.metadata_repo, &config.base_dir, &upstream.mirror_name),
            remote,
            cancel: http.cancellation().clone(),
            http,
            parsers: ParserRegistry::with_default_parsers(),
            inherits: InheritsResolver::with_overrides(&upstream.inherits),
            cache: CacheStore::new(&config.base_dir),
            prompt,
            snapshot: Arc::default(),
            ready: false,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn mirror(&self) -> &MetadataMirror {
        &self.mirror
    }

    /// Cache file name, e.g. `kde-invent-dep-cache.json`.
    pub fn cache_file(&self, kind: &str) -> String {
        format!("{}-{kind}.json", self.name)
    }

    fn check_cancelled(&self) -> Result<(), BackendError> {
        if self.cancel.is_cancelled() {
            Err(BackendError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        self.cache.commit(vec![
            PendingSnapshot::encode(self.cache_file(PROJECTS_CACHE), &snapshot.projects)?,
            PendingSnapshot::encode(self.cache_file(DEPENDENCY_CACHE), &snapshot.dependencies)?,
            PendingSnapshot::encode(self.cache_file(BRANCH_CACHE), &snapshot.branch_rules)?,
            PendingSnapshot::encode(self.cache_file(DOWNLOAD_CACHE), &snapshot.downloads)?,
        ])
    }

    /// Load one cache part; anything unusable is logged and left empty.
    fn load_part<T: DeserializeOwned + Default>(&self, kind: &str) -> T {
        let file = self.cache_file(kind);
        match self.cache.load(&file) {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!(backend = %self.name, file = %file, "Cache file missing; run `bbforge cache update`");
                T::default()
            }
            Err(e) => {
                error!(backend = %self.name, file = %file, error = %e, "Ignoring unusable cache file");
                T::default()
            }
        }
    }
}

impl Backend for UpstreamBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<(), BackendError> {
        if !self.cache.dir().is_dir() {
            return Err(FatalError::MissingBaseDir(self.cache.dir().to_path_buf()).into());
        }
        trace!(
            backend = %self.name,
            release = %self.release,
            parsers = ?self.parsers.names(),
            "Initializing upstream backend"
        );
        self.ready = true;
        Ok(())
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn load_cache(&mut self) -> Result<(), BackendError> {
        let snapshot = Snapshot {
            projects: self.load_part(PROJECTS_CACHE),
            dependencies: self.load_part(DEPENDENCY_CACHE),
            branch_rules: self.load_part(BRANCH_CACHE),
            downloads: self.load_part(DOWNLOAD_CACHE),
        };
        info!(
            backend = %self.name,
            projects = snapshot.projects.len(),
            downloads = snapshot.downloads.len(),
            "Loaded cached metadata"
        );
        self.snapshot = Arc::new(snapshot);
        Ok(())
    }

    fn load_source(&mut self) -> Result<(), BackendError> {
        if !self.ready {
            return Err(BackendError::NotReady(self.name.clone()));
        }
        self.check_cancelled()?;
        self.mirror.sync()?;

        let snapshot = self.build_snapshot()?;
        self.check_cancelled()?;
        self.persist(&snapshot)?;

        info!(
            backend = %self.name,
            projects = snapshot.projects.len(),
            dependencies = snapshot.dependencies.len(),
            downloads = snapshot.downloads.len(),
            "Refreshed upstream metadata"
        );
        self.snapshot = Arc::new(snapshot);
        Ok(())
    }

    fn search_source(&self, keyword: &str) -> Result<Vec<RecipeSource>, BackendError> {
        if !self.ready {
            return Err(BackendError::NotReady(self.name.clone()));
        }
        Ok(self
            .snapshot
            .projects
            .values()
            .map(Project::base_source)
            .filter(|source| source.matches(keyword))
            .collect())
    }

    fn get_recipe(&self, identifier: &str) -> Result<RecipeSource, BackendError> {
        let project = self
            .snapshot
            .projects
            .get(identifier)
            .ok_or_else(|| BackendError::ProjectNotFound(identifier.to_string()))?;
        Ok(self.enrich(project))
    }
}
