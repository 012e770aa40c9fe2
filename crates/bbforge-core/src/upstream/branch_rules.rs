//! Per-release branch selection from `branch-rules.yml`.
//!
//! The file maps a release channel to `path glob: branch` pairs. Rules are
//! kept in declaration order and the first matching glob wins.

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRule {
    pub pattern: String,
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchRules {
    releases: BTreeMap<String, Vec<BranchRule>>,
}

impl BranchRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the YAML document, preserving rule order within each release.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let raw: BTreeMap<String, serde_yaml::Mapping> = serde_yaml::from_str(content)?;
        let mut rules = Self::new();

        for (release, mapping) in raw {
            let mut ordered = Vec::with_capacity(mapping.len());
            for (pattern, branch) in &mapping {
                let (Some(pattern), Some(branch)) = (scalar(pattern), scalar(branch)) else {
                    return Err(serde_yaml::Error::custom(format!(
                        "release '{release}' has a non-scalar rule"
                    )));
                };
                ordered.push(BranchRule { pattern, branch });
            }
            rules.insert(release, ordered);
        }

        Ok(rules)
    }

    pub fn insert(&mut self, release: impl Into<String>, rules: Vec<BranchRule>) {
        self.releases.insert(release.into(), rules);
    }

    pub fn contains(&self, release: &str) -> bool {
        self.releases.contains_key(release)
    }

    pub fn rules(&self, release: &str) -> Option<&[BranchRule]> {
        self.releases.get(release).map(Vec::as_slice)
    }

    pub fn releases(&self) -> impl Iterator<Item = &str> {
        self.releases.keys().map(String::as_str)
    }

    /// Branch of the first rule whose glob matches `repo_path`, else `default`.
    ///
    /// `*` does not cross `/`. Invalid globs are skipped with a warning.
    pub fn resolve(&self, release: &str, repo_path: &str, default: &str) -> String {
        for rule in self.rules(release).unwrap_or_default() {
            let pattern = match Pattern::new(&rule.pattern) {
                Ok(p) => p,
                Err(e) => {
                    warn!(release, pattern = %rule.pattern, error = %e, "Skipping invalid branch rule");
                    continue;
                }
            };
            if pattern.matches_with(repo_path, MATCH_OPTIONS) {
                return rule.branch.clone();
            }
        }
        default.to_string()
    }
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
