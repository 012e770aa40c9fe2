//! One-level dependency declarations (`path: dependency` per line).

use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DEPENDENCY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*):.(.*)$").expect("valid dependency regex"));

/// Project path to the raw dependency paths it declares, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration file. Blank lines, `#` comments and lines without
    /// a `path: dependency` shape are ignored.
    pub fn parse(reader: impl BufRead) -> io::Result<Self> {
        let mut graph = Self::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = DEPENDENCY_LINE.captures(line) {
                let (project, dependency) = (caps[1].trim(), caps[2].trim());
                if !project.is_empty() && !dependency.is_empty() {
                    graph.add(project, dependency);
                }
            }
        }
        Ok(graph)
    }

    pub fn add(&mut self, project: &str, dependency: &str) {
        self.edges
            .entry(project.to_string())
            .or_default()
            .push(dependency.to_string());
    }

    pub fn dependencies_of(&self, project: &str) -> &[String] {
        self.edges.get(project).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of projects with declared dependencies.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
