//! Shared fixtures: a git metadata repository, in-memory remote and HTTP
//! transports, and a scriptable backend.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use git2::{IndexAddOption, Repository, Signature};

use bbforge_core::backend::Backend;
use bbforge_core::config::{BbforgeConfig, DownloadConfig, UpstreamConfig};
use bbforge_core::error::{BackendError, FetchError};
use bbforge_core::net::{Body, CancellationToken, HttpClient, Request, RetryPolicy, Sleeper, Transport};
use bbforge_core::prompt::Prompt;
use bbforge_core::types::RecipeSource;
use bbforge_core::upstream::{RemoteApi, TreeEntry};

pub const LISTING_URL: &str = "https://download.example.org/ls-lR";
pub const DOWNLOAD_BASE: &str = "https://download.example.org/";
pub const KCOREADDONS_TARBALL: &str =
    "https://download.example.org/stable/frameworks/5.115/kcoreaddons-5.115.0.tar.xz";
pub const TARBALL_BYTES: &[u8] = b"not really a tarball";

pub fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("bbforge", "bbforge@example.org").unwrap();
    match repo.head() {
        Ok(head) => {
            let parent = repo.find_commit(head.target().unwrap()).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
                .unwrap()
        }
        Err(_) => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
            .unwrap(),
    }
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn descriptor(name: &str, identifier: &str, description: &str, repo_path: &str) -> String {
    format!(
        "name: {name}\nidentifier: {identifier}\ndescription: {description}\nprojectpath: {repo_path}\nrepoactive: true\nrepopath: {repo_path}\nhasrepo: true\nbugzilla:\n  product: {identifier}\n  component: general\n  __do_not_use-legacy-product:\ntopics:\n"
    )
}

/// A metadata repository with two frameworks, a duplicate identifier, branch
/// rules and a dependency file.
pub fn metadata_repo(root: &Path) -> Repository {
    let repo = Repository::init(root).unwrap();
    write(root, "branch-rules.yml", "\"@stable\":\n  \"frameworks/*\": \"kf5\"\n\"@latest\":\n  \"*\": \"master\"\n");
    write(
        root,
        "dependencies/dependency-data",
        "# frameworks\nframeworks/kcoreaddons: frameworks/extra-cmake-modules\nframeworks/kio: frameworks/kcoreaddons\nframeworks/kio: frameworks/kwindowsystem\n",
    );
    write(
        root,
        "projects/frameworks/kcoreaddons/metadata.yaml",
        &descriptor("KCoreAddons", "kcoreaddons", "Addons to QtCore", "frameworks/kcoreaddons"),
    );
    write(
        root,
        "projects/frameworks/kio/metadata.yaml",
        &descriptor("KIO", "kio", "Network transparent access to files", "frameworks/kio"),
    );
    write(
        root,
        "projects/unmaintained/kcoreaddons/metadata.yaml",
        &descriptor("KCoreAddons (old)", "kcoreaddons", "Old copy", "unmaintained/kcoreaddons"),
    );
    write(root, "projects/frameworks/kio/i18n.json", "{}");
    commit_all(&repo, "Initial metadata");
    repo
}

pub fn config(base_dir: &Path, metadata_repo: &Path) -> BbforgeConfig {
    BbforgeConfig {
        base_dir: base_dir.to_path_buf(),
        upstream: UpstreamConfig {
            metadata_repo: metadata_repo.to_string_lossy().into_owned(),
            dependency_file: "dependencies/dependency-data".to_string(),
            ..Default::default()
        },
        download: DownloadConfig {
            listing_url: LISTING_URL.to_string(),
            base_url: DOWNLOAD_BASE.to_string(),
            strip_prefix: String::new(),
        },
        ..Default::default()
    }
}

pub const KCOREADDONS_APPDATA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<component type="addon">
  <id>org.kde.kcoreaddons</id>
  <name>KCoreAddons</name>
  <summary>Addons to QtCore</summary>
  <summary xml:lang="de">Erweiterungen zu QtCore</summary>
  <description>
    <p>KCoreAddons provides classes built on top of QtCore.</p>
  </description>
  <releases>
    <release version="5.116.0-rc1"/>
    <release version="5.115.0"/>
    <release version="5.114.0"/>
  </releases>
</component>
"#;

pub const KCOREADDONS_CI: &str = "Dependencies:\n- 'on': ['@all']\n  'require':\n    'frameworks/extra-cmake-modules': '@same'\n";

/// Remote content keyed by `(repo, path, ref)`.
#[derive(Debug, Default)]
pub struct FakeRemote {
    files: BTreeMap<(String, String, String), Vec<u8>>,
    trees: BTreeMap<(String, String, String), Vec<TreeEntry>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn kde() -> Self {
        let mut remote = Self::default();
        remote.add_file("frameworks/kcoreaddons", ".kde-ci.yml", "kf5", KCOREADDONS_CI);
        remote.add_file(
            "frameworks/kcoreaddons",
            "org.kde.kcoreaddons.appdata.xml",
            "kf5",
            KCOREADDONS_APPDATA,
        );
        remote.add_tree(
            "frameworks/kcoreaddons",
            "LICENSES",
            "kf5",
            &[("LGPL-2.0-or-later.txt", "blob"), ("CC0-1.0.txt", "blob"), ("extra", "tree")],
        );
        remote
    }

    pub fn add_file(&mut self, repo: &str, path: &str, reference: &str, content: &str) {
        self.files.insert(
            (repo.into(), path.into(), reference.into()),
            content.as_bytes().to_vec(),
        );
    }

    pub fn add_tree(&mut self, repo: &str, dir: &str, reference: &str, entries: &[(&str, &str)]) {
        let entries = entries
            .iter()
            .map(|(name, kind)| TreeEntry {
                name: name.to_string(),
                kind: kind.to_string(),
                path: format!("{dir}/{name}"),
            })
            .collect();
        self.trees.insert((repo.into(), dir.into(), reference.into()), entries);
    }
}

impl RemoteApi for FakeRemote {
    fn file(&self, repo_path: &str, file_path: &str, reference: &str) -> Result<Vec<u8>, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{repo_path}:{file_path}@{reference}"));
        self.files
            .get(&(repo_path.into(), file_path.into(), reference.into()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("{repo_path}/{file_path}")))
    }

    fn tree(&self, repo_path: &str, directory: &str, reference: &str) -> Result<Vec<TreeEntry>, FetchError> {
        self.trees
            .get(&(repo_path.into(), directory.into(), reference.into()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("{repo_path}/{directory}")))
    }
}

/// HTTP responses keyed by URL; anything else is a 404.
#[derive(Debug, Default)]
pub struct MapTransport {
    responses: BTreeMap<String, Vec<u8>>,
    pub hits: AtomicUsize,
}

impl MapTransport {
    pub fn downloads() -> Self {
        let mut transport = Self::default();
        transport.insert(
            LISTING_URL,
            "./stable/frameworks/5.115:\n-rw-r--r-- 1 ftp ftp 20 Feb 10 12:00 kcoreaddons-5.115.0.tar.xz\n-rw-r--r-- 1 ftp ftp 20 Feb 10 12:00 kio-5.115.0.tar.xz\n".as_bytes(),
        );
        transport.insert(KCOREADDONS_TARBALL, TARBALL_BYTES);
        transport
    }

    pub fn insert(&mut self, url: &str, body: &[u8]) {
        self.responses.insert(url.to_string(), body.to_vec());
    }
}

impl Transport for MapTransport {
    fn get(&self, request: &Request) -> Result<Body, FetchError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(&request.url)
            .map(|bytes| Box::new(io::Cursor::new(bytes.clone())) as Body)
            .ok_or_else(|| FetchError::NotFound(request.url.clone()))
    }
}

#[derive(Debug)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

pub fn http_client(transport: Arc<dyn Transport>, cancel: CancellationToken) -> HttpClient {
    let retry = RetryPolicy::new(2, Duration::from_millis(1)).with_sleeper(Arc::new(NoSleep));
    HttpClient::new(transport, retry, cancel)
}

/// Answers prompts from a fixed list and records the questions.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: BTreeMap<String, String>,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(q, a)| (q.to_string(), a.to_string()))
                .collect(),
            asked: Mutex::new(Vec::new()),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, question: &str) -> anyhow::Result<String> {
        self.asked.lock().unwrap().push(question.to_string());
        Ok(self.answers.get(question).cloned().unwrap_or_default())
    }
}

/// Backend with canned recipes and configurable failures.
#[derive(Debug)]
pub struct FakeBackend {
    pub name: String,
    pub ready: bool,
    pub recipes: Vec<RecipeSource>,
    pub fail_search: bool,
    pub fail_load: Option<fn() -> BackendError>,
    pub loads: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ready: true,
            recipes: Vec::new(),
            fail_search: false,
            fail_load: None,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_recipe(mut self, recipe: RecipeSource) -> Self {
        self.recipes.push(recipe);
        self
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn load_cache(&mut self) -> Result<(), BackendError> {
        self.load_source()
    }

    fn load_source(&mut self) -> Result<(), BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.fail_load {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    fn search_source(&self, keyword: &str) -> Result<Vec<RecipeSource>, BackendError> {
        if self.fail_search {
            return Err(BackendError::NotReady(self.name.clone()));
        }
        Ok(self
            .recipes
            .iter()
            .filter(|r| r.matches(keyword))
            .cloned()
            .collect())
    }

    fn get_recipe(&self, identifier: &str) -> Result<RecipeSource, BackendError> {
        self.recipes
            .iter()
            .find(|r| r.identifier == identifier)
            .cloned()
            .ok_or_else(|| BackendError::ProjectNotFound(identifier.to_string()))
    }
}

pub fn recipe(identifier: &str, version: Option<&str>, depends: &[&str]) -> RecipeSource {
    RecipeSource {
        name: identifier.to_string(),
        identifier: identifier.to_string(),
        description: format!("The {identifier} framework"),
        version: version.map(str::to_string),
        section: "frameworks".to_string(),
        backend: "fake".to_string(),
        inherits: vec!["cmake_plasma".to_string(), "reuse_license_checksums".to_string()],
        depends: depends.iter().map(|d| d.to_string()).collect(),
        licenses: vec!["LGPL-2.0-or-later".to_string()],
        ..Default::default()
    }
}

pub fn temp_path(temp: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = temp.path().join(name);
    fs::create_dir_all(&path).unwrap();
    path
}
