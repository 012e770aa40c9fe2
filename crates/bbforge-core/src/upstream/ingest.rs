//! Live ingestion from the metadata mirror.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;
use tracing::{debug, error, trace, warn};
use walkdir::WalkDir;

use super::{
    AppStreamMetadata, BranchMetadata, BranchRules, CiDepsMetadata, DependencyGraph, Project,
    ProjectDescriptor, Snapshot, UpstreamBackend,
};
use crate::download::DownloadIndex;
use crate::error::{BackendError, FatalError, FetchError, IndexError};
use crate::parser::Attributes;

const BRANCH_RULES_FILE: &str = "branch-rules.yml";
const DESCRIPTOR_FILE: &str = "metadata.yaml";
const CI_FILE: &str = ".kde-ci.yml";

impl UpstreamBackend {
    /// Build a complete snapshot from the synced mirror and remote APIs.
    pub(super) fn build_snapshot(&self) -> Result<Snapshot, BackendError> {
        let root = self.mirror.path();

        let branch_rules = read_branch_rules(root)?;
        if !branch_rules.contains(&self.release) {
            return Err(FatalError::UnknownRelease(self.release.clone()).into());
        }
        let dependencies = read_dependency_graph(&root.join(&self.dependency_file));

        let mut descriptors = Vec::new();
        for path in find_descriptors(root) {
            self.check_cancelled()?;
            match read_descriptor(&path) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => error!(path = %path.display(), error = %format!("{e:#}"), "Skipping project descriptor"),
            }
        }
        debug!(descriptors = descriptors.len(), "Decoded project descriptors");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("bbforge-fetch-{i}"))
            .build()?;
        let prepared: Vec<Project> = pool.install(|| {
            descriptors
                .into_par_iter()
                .map(|descriptor| self.prepare(descriptor, &branch_rules))
                .collect()
        });
        self.check_cancelled()?;

        // Acceptance runs in walk order so the first occurrence always wins.
        let mut projects = BTreeMap::new();
        for project in prepared {
            match projects.entry(project.identifier.clone()) {
                Entry::Occupied(kept) => {
                    let kept: &Project = kept.get();
                    warn!(
                        identifier = %project.identifier,
                        kept = %kept.repo_path,
                        discarded = %project.repo_path,
                        "Duplicate project identifier"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(project);
                }
            }
        }

        self.check_cancelled()?;
        let downloads = DownloadIndex::refresh(&self.http, &self.download).map_err(|e| match e {
            IndexError::Network {
                source: FetchError::Cancelled,
                ..
            } => BackendError::Cancelled,
            other => BackendError::DownloadIndex(other),
        })?;

        Ok(Snapshot {
            projects,
            dependencies,
            branch_rules,
            downloads,
        })
    }

    /// Resolve the branch and fetch the auxiliary files of one project.
    fn prepare(&self, descriptor: ProjectDescriptor, rules: &BranchRules) -> Project {
        let mut project = Project::from_descriptor(descriptor, &self.name, &self.gitlab);
        let branch = rules.resolve(&self.release, &project.repo_path, &self.default_branch);
        project.metadata.branch_rules = Some(BranchMetadata {
            branch: branch.clone(),
        });

        if !project.is_fetchable() {
            debug!(identifier = %project.identifier, "Project has no repository, skipping auxiliary files");
            return project;
        }

        project.metadata.ci_deps = self.fetch_slot::<CiDepsMetadata>(&project, CI_FILE, &branch, "kde-ci");
        let appdata = format!("org.kde.{}.appdata.xml", project.identifier);
        project.metadata.appstream =
            self.fetch_slot::<AppStreamMetadata>(&project, &appdata, &branch, "appstream");
        project
    }

    /// Fetch `file` and decode it into a metadata slot. Absence and failures
    /// both yield `None`; only unexpected failures are logged as errors.
    fn fetch_slot<T>(&self, project: &Project, file: &str, branch: &str, parser: &str) -> Option<T>
    where
        T: TryFrom<Attributes, Error = serde_json::Error>,
    {
        if self.cancel.is_cancelled() {
            return None;
        }

        let payload = match self.remote.file(&project.repo_path, file, branch) {
            Ok(payload) => payload,
            Err(FetchError::NotFound(_)) => {
                trace!(identifier = %project.identifier, file, branch, "Auxiliary file not present");
                return None;
            }
            Err(FetchError::Cancelled) => return None,
            Err(e) => {
                error!(identifier = %project.identifier, file, branch, error = %e, "Failed to fetch auxiliary file");
                return None;
            }
        };

        let attributes = match self.parsers.parse(parser, &payload) {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(identifier = %project.identifier, file, parser, error = %e, "Failed to parse auxiliary file");
                return None;
            }
        };

        match T::try_from(attributes) {
            Ok(slot) => Some(slot),
            Err(e) => {
                warn!(identifier = %project.identifier, file, parser, error = %e, "Unexpected parser output");
                None
            }
        }
    }
}

fn read_branch_rules(root: &Path) -> Result<BranchRules, FatalError> {
    let path = root.join(BRANCH_RULES_FILE);
    let content = fs::read_to_string(&path).map_err(|source| FatalError::BranchRulesRead {
        path: path.clone(),
        source,
    })?;
    BranchRules::from_yaml(&content).map_err(|source| FatalError::BranchRulesParse { path, source })
}

fn read_dependency_graph(path: &Path) -> DependencyGraph {
    let parsed = File::open(path).and_then(|file| DependencyGraph::parse(BufReader::new(file)));
    match parsed {
        Ok(graph) => graph,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read dependency file, continuing without dependencies");
            DependencyGraph::default()
        }
    }
}

/// Every descriptor under `root` in sorted path order, skipping `.git`.
fn find_descriptors(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path in metadata mirror");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == DESCRIPTOR_FILE)
        .map(|entry| entry.into_path())
        .collect()
}

fn read_descriptor(path: &Path) -> anyhow::Result<ProjectDescriptor> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to decode {}", path.display()))
}
