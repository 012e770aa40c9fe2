//! Lazy enrichment of a stored project into a full recipe descriptor.
//!
//! Every step is best-effort: a missing value stays absent and the failure
//! is logged.

use tracing::{debug, error, warn};

use super::{Project, UpstreamBackend};
use crate::error::{FetchError, IndexError};
use crate::types::RecipeSource;

const LICENSES_DIR: &str = "LICENSES";

impl UpstreamBackend {
    pub(super) fn enrich(&self, project: &Project) -> RecipeSource {
        let mut recipe = project.base_source();
        let appstream = project.metadata.appstream.as_ref();

        // The prompt stands in for a missing AppStream file only; a file
        // without a stable release leaves the version absent.
        match appstream {
            Some(appstream) => {
                recipe.summary = appstream.summary.clone();
                recipe.version = appstream.version.clone();
            }
            None => {
                recipe.summary = self.ask(&format!("Summary for {}", project.identifier));
                recipe.version = self.ask(&format!("Version number for {}", project.identifier));
            }
        }
        if recipe.description.is_empty() {
            if let Some(description) = appstream.and_then(|a| a.description.clone()) {
                recipe.description = description;
            }
        }

        if let Some(version) = recipe.version.clone() {
            self.attach_artifact(&mut recipe, &version);
        }

        recipe.licenses = self.licenses(project);

        let resolved = self.inherits.resolve_all(self.dependencies(project));
        recipe.inherits = resolved.inherits;
        recipe.depends = resolved.depends;

        recipe
    }

    /// Edges from the dependency file, or the CI requirements when the file
    /// names none for this project.
    fn dependencies<'p>(&'p self, project: &'p Project) -> &'p [String] {
        let declared = self.snapshot.dependencies.dependencies_of(&project.project_path);
        if !declared.is_empty() {
            return declared;
        }
        match &project.metadata.ci_deps {
            Some(ci) if !ci.requires.is_empty() => {
                debug!(identifier = %project.identifier, "Using CI requirements as dependencies");
                &ci.requires
            }
            _ => declared,
        }
    }

    /// Ask the prompt; a blank answer or a prompt failure means no value.
    fn ask(&self, question: &str) -> Option<String> {
        match self.prompt.ask(question) {
            Ok(answer) => {
                let answer = answer.trim();
                (!answer.is_empty()).then(|| answer.to_string())
            }
            Err(e) => {
                warn!(question, error = %format!("{e:#}"), "Prompt failed");
                None
            }
        }
    }

    fn attach_artifact(&self, recipe: &mut RecipeSource, version: &str) {
        let downloads = &self.snapshot.downloads;
        match downloads.resolve(&recipe.identifier, version) {
            Ok(url) => recipe.src_uri = Some(url),
            Err(e) => {
                warn!(identifier = %recipe.identifier, version, error = %e, "No source artifact");
                return;
            }
        }

        match downloads.checksum_of(&self.http, &recipe.identifier, version) {
            Ok(sha256) => recipe.src_sha256 = Some(sha256),
            Err(IndexError::Network {
                source: FetchError::Cancelled,
                ..
            }) => debug!(identifier = %recipe.identifier, "Checksum cancelled"),
            Err(e) => error!(identifier = %recipe.identifier, version, error = %e, "Failed to checksum source artifact"),
        }
    }

    /// License file names in the repository's `LICENSES` directory.
    fn licenses(&self, project: &Project) -> Vec<String> {
        let Some(branch) = project.branch() else {
            return Vec::new();
        };
        if !project.is_fetchable() {
            return Vec::new();
        }

        match self.remote.tree(&project.repo_path, LICENSES_DIR, branch) {
            Ok(entries) => entries
                .iter()
                .filter(|entry| entry.is_file())
                .map(|entry| {
                    entry
                        .name
                        .strip_suffix(".txt")
                        .unwrap_or(&entry.name)
                        .to_string()
                })
                .collect(),
            Err(FetchError::NotFound(_)) => Vec::new(),
            Err(e) => {
                error!(identifier = %project.identifier, branch, error = %e, "Failed to list licenses");
                Vec::new()
            }
        }
    }
}
