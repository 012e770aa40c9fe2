//! Project descriptors and their stored, enriched form.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::parser::Attributes;
use crate::types::RecipeSource;

/// Section used when the repository path has no parent directory.
pub const FALLBACK_SECTION: &str = "misc";

/// One `metadata.yaml` from the metadata repository.
///
/// Unknown keys are rejected so schema drift upstream is noticed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDescriptor {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub identifier: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub projectpath: String,
    #[serde(default)]
    pub repoactive: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub repopath: String,
    #[serde(default)]
    pub hasrepo: bool,
    #[serde(default)]
    pub bugzilla: Option<Bugzilla>,
    #[serde(default, deserialize_with = "nullable")]
    pub topics: Vec<String>,
}

/// Issue tracker fields of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bugzilla {
    #[serde(default, deserialize_with = "nullable")]
    pub product: String,
    #[serde(default, deserialize_with = "nullable")]
    pub component: String,
    #[serde(
        default,
        rename = "__do_not_use-legacy-product",
        deserialize_with = "nullable"
    )]
    pub legacy_product: String,
}

/// YAML `key:` with no value decodes to the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored project: descriptor fields plus producer metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub identifier: String,
    pub description: String,
    pub project_path: String,
    pub repo_path: String,
    pub repo_active: bool,
    pub has_repo: bool,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub bugzilla: Option<Bugzilla>,
    /// Web URL of the repository.
    pub url: String,
    pub backend: String,
    #[serde(default)]
    pub metadata: ProjectMetadata,
}

impl Project {
    pub fn from_descriptor(descriptor: ProjectDescriptor, backend: &str, gitlab: &Url) -> Self {
        let url = gitlab
            .join(&descriptor.repopath)
            .map(String::from)
            .unwrap_or_else(|_| gitlab.to_string());
        Self {
            name: descriptor.name,
            identifier: descriptor.identifier,
            description: descriptor.description,
            project_path: descriptor.projectpath,
            repo_path: descriptor.repopath,
            repo_active: descriptor.repoactive,
            has_repo: descriptor.hasrepo,
            topics: descriptor.topics,
            bugzilla: descriptor.bugzilla,
            url,
            backend: backend.to_string(),
            metadata: ProjectMetadata::default(),
        }
    }

    /// Whether auxiliary files can be fetched from a repository.
    pub fn is_fetchable(&self) -> bool {
        self.has_repo && !self.repo_path.is_empty()
    }

    /// Branch resolved at ingestion time.
    pub fn branch(&self) -> Option<&str> {
        self.metadata.branch_rules.as_ref().map(|b| b.branch.as_str())
    }

    /// Parent directory of the repository path, e.g. `frameworks`.
    pub fn section(&self) -> String {
        Path::new(&self.repo_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_SECTION.to_string())
    }

    /// Un-enriched view used for search results.
    pub fn base_source(&self) -> RecipeSource {
        RecipeSource {
            name: self.name.clone(),
            identifier: self.identifier.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            section: self.section(),
            backend: self.backend.clone(),
            ..RecipeSource::default()
        }
    }
}

/// Auxiliary metadata, one typed slot per producer.
///
/// Each slot is written only by its producer during ingestion. `extra` holds
/// payloads of producers this version does not know about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(rename = "branch-rules", default, skip_serializing_if = "Option::is_none")]
    pub branch_rules: Option<BranchMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appstream: Option<AppStreamMetadata>,
    #[serde(rename = "ci-deps", default, skip_serializing_if = "Option::is_none")]
    pub ci_deps: Option<CiDepsMetadata>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMetadata {
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStreamMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Requirements declared in the project's CI file. Used as the dependency
/// list when the dependency file has no entry for the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiDepsMetadata {
    #[serde(default)]
    pub requires: Vec<String>,
}

impl TryFrom<Attributes> for AppStreamMetadata {
    type Error = serde_json::Error;

    fn try_from(attributes: Attributes) -> Result<Self, Self::Error> {
        serde_json::from_value(serde_json::Value::Object(attributes))
    }
}

impl TryFrom<Attributes> for CiDepsMetadata {
    type Error = serde_json::Error;

    fn try_from(attributes: Attributes) -> Result<Self, Self::Error> {
        serde_json::from_value(serde_json::Value::Object(attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"
description: Addons to QtCore
hasrepo: true
identifier: kcoreaddons
name: KCoreAddons
projectpath: frameworks/kcoreaddons
repoactive: true
repopath: frameworks/kcoreaddons
bugzilla:
  product: frameworks-kcoreaddons
  component: general
  __do_not_use-legacy-product: kdelibs
topics:
  - framework
"#;

    fn gitlab() -> Url {
        Url::parse("https://invent.kde.org/").unwrap()
    }

    #[test]
    fn test_decode_descriptor() {
        let descriptor: ProjectDescriptor = serde_yaml::from_str(DESCRIPTOR).unwrap();
        assert_eq!(descriptor.identifier, "kcoreaddons");
        assert!(descriptor.hasrepo);
        let bugzilla = descriptor.bugzilla.unwrap();
        assert_eq!(bugzilla.legacy_product, "kdelibs");
        assert_eq!(descriptor.topics, vec!["framework"]);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = format!("{DESCRIPTOR}maintainer: someone\n");
        assert!(serde_yaml::from_str::<ProjectDescriptor>(&yaml).is_err());
    }

    #[test]
    fn test_null_description_is_empty() {
        let yaml = "name: Foo\nidentifier: foo\ndescription:\nrepopath: utilities/foo\n";
        let descriptor: ProjectDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(descriptor.description, "");
        assert!(!descriptor.hasrepo);
    }

    #[test]
    fn test_project_from_descriptor() {
        let descriptor: ProjectDescriptor = serde_yaml::from_str(DESCRIPTOR).unwrap();
        let project = Project::from_descriptor(descriptor, "kde-invent", &gitlab());

        assert_eq!(project.url, "https://invent.kde.org/frameworks/kcoreaddons");
        assert_eq!(project.section(), "frameworks");
        assert!(project.is_fetchable());
        assert_eq!(project.branch(), None);

        let base = project.base_source();
        assert_eq!(base.backend, "kde-invent");
        assert_eq!(base.section, "frameworks");
        assert_eq!(base.version, None);
    }

    #[test]
    fn test_section_without_parent() {
        let descriptor: ProjectDescriptor =
            serde_yaml::from_str("name: Top\nidentifier: top\nrepopath: top\n").unwrap();
        let project = Project::from_descriptor(descriptor, "kde-invent", &gitlab());
        assert_eq!(project.section(), FALLBACK_SECTION);
    }

    #[test]
    fn test_metadata_serializes_under_producer_names() {
        let metadata = ProjectMetadata {
            branch_rules: Some(BranchMetadata {
                branch: "release/24.08".into(),
            }),
            ci_deps: Some(CiDepsMetadata {
                requires: vec!["frameworks/kconfig".into()],
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["branch-rules"]["branch"], "release/24.08");
        assert_eq!(value["ci-deps"]["requires"][0], "frameworks/kconfig");
        assert!(value.get("appstream").is_none());
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_appstream_metadata_from_attributes() {
        let mut attributes = Attributes::new();
        attributes.insert("summary".into(), "Addons".into());
        attributes.insert("version".into(), "5.2.0".into());

        let metadata = AppStreamMetadata::try_from(attributes).unwrap();
        assert_eq!(metadata.summary.as_deref(), Some("Addons"));
        assert_eq!(metadata.description, None);
        assert_eq!(metadata.version.as_deref(), Some("5.2.0"));
    }
}
