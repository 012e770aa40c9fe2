//! Classifies dependency edges into inherited classes and plain depends.
//!
//! A dependency listed in the inherits table is satisfied by inheriting a
//! BitBake class; every other dependency becomes a recipe dependency named by
//! the basename of its path. Only direct edges are considered.

use std::collections::BTreeMap;
use std::path::Path;

use super::DependencyGraph;

/// Inherited by every generated recipe, always last.
pub const BASELINE_INHERIT: &str = "reuse_license_checksums";

const DEFAULT_INHERITS: &[(&str, &str)] = &[
    ("frameworks/extra-cmake-modules", "cmake_plasma"),
    ("frameworks/kauth", "kauth"),
    ("frameworks/kcmutils", "kcmutils"),
    ("frameworks/kconfig", "kconfig"),
    ("frameworks/kcoreaddons", "kcoreaddons"),
    ("frameworks/kdoctools", "kdoctools"),
    ("frameworks/ki18n", "ki18n"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub inherits: Vec<String>,
    pub depends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritsResolver {
    table: BTreeMap<String, String>,
}

impl Default for InheritsResolver {
    fn default() -> Self {
        Self {
            table: DEFAULT_INHERITS
                .iter()
                .map(|(path, class)| (path.to_string(), class.to_string()))
                .collect(),
        }
    }
}

impl InheritsResolver {
    /// Built-in table with `overrides` merged on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut resolver = Self::default();
        resolver
            .table
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        resolver
    }

    pub fn class_for(&self, dependency: &str) -> Option<&str> {
        self.table.get(dependency).map(String::as_str)
    }

    pub fn resolve(&self, project_path: &str, graph: &DependencyGraph) -> Resolved {
        self.resolve_all(graph.dependencies_of(project_path))
    }

    /// Classify an explicit list of dependency paths.
    pub fn resolve_all(&self, dependencies: &[String]) -> Resolved {
        let mut resolved = Resolved::default();
        for dependency in dependencies {
            match self.class_for(dependency) {
                Some(class) => resolved.inherits.push(class.to_string()),
                None => resolved.depends.push(basename(dependency)),
            }
        }
        resolved.inherits.push(BASELINE_INHERIT.to_string());
        resolved
    }
}

fn basename(dependency: &str) -> String {
    Path::new(dependency)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dependency.to_string())
}
